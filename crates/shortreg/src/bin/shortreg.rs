fn main() -> anyhow::Result<()> {
    shortreg::cli::init_logging();
    shortreg::cli::run()
}
