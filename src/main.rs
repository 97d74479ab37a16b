// wordvoice command line entry point
fn main() -> anyhow::Result<()> {
    wordvoice_lib::run()
}
