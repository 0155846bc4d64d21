mod engine;
mod resolve;
