use solidifi_cli::args;

fn main() -> eyre::Result<()> {
    args::run()
}
