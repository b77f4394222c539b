//! Extract tracked motion trails into an easy-to-read file.

use clap::*;
use log::*;
use motrail::prelude::v1::{Result, *};
use std::fs::File;
use std::io::{BufWriter, Write};

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("trail-extract")
        .version(crate_version!())
        .author(crate_authors!())
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::new("ticks")
                .long("ticks")
                .short('t')
                .takes_value(true)
                .required(false),
        )
        .arg(Arg::new("input").takes_value(true).required(true))
        .arg(Arg::new("output").takes_value(true).required(true))
        .get_matches();

    let input = matches.value_of("input").unwrap();
    let output = matches.value_of("output").unwrap();
    let max_ticks: Option<usize> = matches.value_of("ticks").map(str::parse).transpose()?;

    let config = match matches.value_of("config") {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => PipelineConfig::default(),
    };

    let capture = frame_loader::create_capture(input)?;
    let mut pipeline = TrailPipeline::new(capture, config)?;

    if let Some(framerate) = pipeline.get_framerate() {
        info!("source framerate: {}", framerate);
    }

    let out = File::create(format!("{output}.trail"))?;
    let mut out = BufWriter::new(out);

    let mut written = 0usize;

    loop {
        if max_ticks.map(|n| written >= n).unwrap_or(false) {
            break;
        }

        match pipeline.tick() {
            Ok(true) => {
                write_tick(&mut out, &pipeline)?;
                written += 1;
            }
            // Source not ready yet; try again.
            Ok(false) => continue,
            Err(e) => {
                info!("capture ended: {}", e);
                break;
            }
        }
    }

    out.flush()?;
    info!("wrote {} ticks", written);

    Ok(())
}

/// Append one tick of trail state.
///
/// Layout: tick and trail count as 32-bit LE integers, then per trail its
/// id (64-bit LE), active flag (one byte), speed (f32 LE) and point count
/// (32-bit LE), followed by x, y, speed, intensity and age of every point
/// as f32 LE groups.
fn write_tick(out: &mut impl Write, pipeline: &TrailPipeline) -> Result<()> {
    out.write_all(&(pipeline.ticks() as u32).to_le_bytes())?;
    out.write_all(&(pipeline.trails().count() as u32).to_le_bytes())?;

    for trail in pipeline.trails() {
        out.write_all(&trail.id().0.to_le_bytes())?;
        out.write_all(&[trail.active() as u8])?;
        out.write_all(&trail.speed().to_le_bytes())?;
        out.write_all(&(trail.points().len() as u32).to_le_bytes())?;

        for point in trail.points() {
            for v in [
                point.pos.x,
                point.pos.y,
                point.speed,
                point.intensity,
                point.age,
            ] {
                out.write_all(&v.to_le_bytes())?;
            }
        }
    }

    Ok(())
}
