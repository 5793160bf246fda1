//! Model verification command

use crate::VerifyArgs;
use anyhow::{Result, bail};

pub fn run(args: VerifyArgs) -> Result<()> {
    let mpp = super::load_model(&args.model)?;
    let m = super::load_measurements(&args.input)?;
    if m.mask != mpp.mask() {
        bail!("model is {}, measurements are {}", mpp.mask(), m.mask);
    }
    let report = mpp.fit_report(&m.samples)?;
    println!("{}: {report}", args.input.display());
    Ok(())
}
