//! Model info command

use crate::InfoArgs;
use anyhow::Result;
use mpp_model::Mpp;
use std::path::Path;

pub fn run(args: InfoArgs) -> Result<()> {
    for (i, path) in args.input.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let mpp = super::load_model(path)?;
        print_text(path, &mpp);
    }
    Ok(())
}

fn print_text(path: &Path, mpp: &Mpp) {
    let info = mpp.info();
    println!("{}", path.display());
    println!("  Colorants:  {} ({} channels)", info.mask, info.channels);
    println!("  Class:      {}", info.class);
    match info.limit {
        Some(l) => println!("  Ink limit:  {:.0}%", l * 100.0),
        None => println!("  Ink limit:  none"),
    }
    println!("  Transfer:   order {}", info.transfer_order);
    println!("  Shape:      {}", if info.shaped { "yes" } else { "no" });
    if let Some(s) = info.spectral {
        println!("  Spectral:   {} bands, {}-{} nm", s.bands, s.start_nm, s.end_nm);
    }
    if let Some(inst) = &info.instrument {
        println!("  Instrument: {inst}");
    }

    let wb = mpp.get_wb();
    let lab = wb.lab();
    println!("  White:      Lab {}  dev {:?}", super::fmt3(lab.white), wb.white);
    println!("  Black:      Lab {}  dev {:?}", super::fmt3(lab.black), wb.black);
    if wb.kblack != wb.black {
        println!("  K black:    Lab {}  dev {:?}", super::fmt3(lab.kblack), wb.kblack);
    }
}
