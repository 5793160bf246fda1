//! Gamut surface command

use crate::GamutArgs;
use anyhow::{Context, Result};
use mpp_cgats::{Cgats, FieldType, Value};
use mpp_model::GamutSurface;

/// Surface points and cusps as two CGATS tables.
fn surface_cgats(surface: &GamutSurface) -> Result<Cgats> {
    let mut cg = Cgats::new();
    for (kind, points) in [("GAMUT_SURFACE", &surface.points), ("GAMUT_CUSPS", &surface.cusps)] {
        let t = cg.add_table(kind);
        t.add_kword("DESCRIPTOR", "Model printer profile gamut");
        let named = [("WHITE", surface.white), ("BLACK", surface.black), ("KBLACK", surface.kblack)];
        for (name, lab) in named {
            if let Some(lab) = lab {
                t.add_kword(&format!("{name}_LAB"), format!("{} {} {}", lab[0], lab[1], lab[2]));
            }
        }
        for name in ["LAB_L", "LAB_A", "LAB_B"] {
            t.add_field(name, FieldType::Real)?;
        }
        for p in points {
            t.add_set(p.iter().map(|&v| Value::Real(v)).collect())?;
        }
    }
    Ok(cg)
}

pub fn run(args: GamutArgs, verbose: u8) -> Result<()> {
    let mpp = super::load_model(&args.model)?;
    let mut surface = GamutSurface::new();
    mpp.get_gamut(args.detail, &mut surface)?;

    surface_cgats(&surface)?
        .write_file(&args.output)
        .with_context(|| format!("Failed to write: {}", args.output.display()))?;

    if verbose > 0 {
        if let Some((lo, hi)) = surface.bounds() {
            println!("L {:.1}..{:.1}  a {:.1}..{:.1}  b {:.1}..{:.1}", lo[0], hi[0], lo[1], hi[1], lo[2], hi[2]);
        }
    }
    println!("{}: {} points, {} cusps", args.output.display(), surface.points.len(), surface.cusps.len());
    Ok(())
}
