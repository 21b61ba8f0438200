use color_eyre::eyre::Result;

use swapmc::app::{setup_logging, Application};

fn main() -> Result<()> {
    color_eyre::install()?;
    setup_logging();
    Application::from_cli()?.run()
}
