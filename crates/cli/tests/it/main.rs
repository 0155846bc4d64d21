mod clean;
mod inject;
