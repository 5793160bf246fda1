//! Device value lookup command

use crate::LookupArgs;
use anyhow::{Result, bail};
use mpp_color::Illuminant;

pub fn run(args: LookupArgs) -> Result<()> {
    let mut mpp = super::load_model(&args.model)?;
    if args.values.len() != mpp.channels() {
        bail!(
            "{} has {} channels ({}), got {} values",
            args.model.display(),
            mpp.channels(),
            mpp.mask(),
            args.values.len()
        );
    }
    if let Some(name) = &args.illuminant {
        mpp.set_ilob(Some(name.parse::<Illuminant>()?))?;
    }

    let dev: Vec<f64> = args.values.iter().map(|v| v / 100.0).collect();
    if args.lab {
        println!("Lab {}", super::fmt3(mpp.lookup_lab(&dev)));
    } else {
        println!("XYZ {}", super::fmt3(mpp.lookup(&dev).map(|v| v * 100.0)));
    }

    if args.spectral {
        let spec = mpp.lookup_spec(&dev)?;
        if let Some(shape) = mpp.info().spectral {
            for (i, v) in spec.iter().enumerate() {
                println!("{:5.0} nm {:8.4}", shape.wavelength(i), v);
            }
        }
    }
    Ok(())
}
