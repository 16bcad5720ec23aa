use anyhow::Context;
use clap::Parser;
use decimesh::obj::{read_obj, write_obj};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "decimesh")]
#[command(about = "Simplifies triangular OBJ meshes with quadric error metrics")]
#[command(version)]
struct Cli {
    /// input OBJ file
    input: PathBuf,

    /// output prefix; every ratio r writes <prefix>_<r>.obj
    output_prefix: String,

    /// comma separated target vertex ratios, each in (0, 1]
    #[arg(value_delimiter = ',', num_args = 1, required = true, value_parser = parse_ratio)]
    ratios: Vec<f64>,

    /// distance below which non-adjacent vertices also become contraction
    /// candidates; 0 keeps topological edges only
    #[arg(value_parser = parse_epsilon)]
    epsilon: f64,

    /// significant decimal digits in the output
    #[arg(short, long, default_value_t = 8)]
    precision: usize,
}

fn parse_ratio(text: &str) -> Result<f64, String> {
    let ratio: f64 = text
        .parse()
        .map_err(|_| format!("{text:?} is not a number"))?;
    if ratio > 0.0 && ratio <= 1.0 {
        Ok(ratio)
    } else {
        Err(format!("ratio {ratio} is outside (0, 1]"))
    }
}

fn parse_epsilon(text: &str) -> Result<f64, String> {
    let epsilon: f64 = text
        .parse()
        .map_err(|_| format!("{text:?} is not a number"))?;
    if epsilon >= 0.0 {
        Ok(epsilon)
    } else {
        Err("epsilon must not be negative".to_owned())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let input = File::open(&cli.input)
        .with_context(|| format!("cannot open {}", cli.input.display()))?;
    let mut mesh = read_obj(BufReader::new(input))
        .with_context(|| format!("cannot read {}", cli.input.display()))?;
    log::info!(
        "loaded {} vertices and {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    );

    mesh.simplify(&cli.ratios, cli.epsilon, |ratio, mesh| -> anyhow::Result<()> {
        let path = format!("{}_{}.obj", cli.output_prefix, ratio);
        let file = File::create(&path).with_context(|| format!("cannot create {path}"))?;
        let mut out = BufWriter::new(file);
        write_obj(mesh, &mut out, cli.precision)
            .with_context(|| format!("cannot write {path}"))?;
        out.flush().with_context(|| format!("cannot write {path}"))?;
        log::info!(
            "ratio {}: {} vertices left, wrote {}",
            ratio,
            mesh.survivor_count(),
            path
        );
        Ok(())
    })
}
