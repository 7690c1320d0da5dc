//! Build command: print the merged configuration.

use crate::overrides::ConfigArgs;

pub fn execute(args: &ConfigArgs) -> anyhow::Result<()> {
    let config = args.build()?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}
