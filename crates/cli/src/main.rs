use anyhow::Result;
use clap::{Parser, Subcommand};
use types::TagCounts;

#[derive(Parser)]
#[command(version, about, long_about)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count every (key, value) tag pair by carrying primitive kind.
    CountTags {
        #[arg(short, long)]
        osm_pbf_file: String,

        /// Only print the highest-total rows.
        #[arg(short, long)]
        top: Option<usize>,

        #[arg(short, long, default_value_t = false)]
        json: bool,
    },
    /// Resolve every primitive tagged key=value into GeoJSON features.
    Extract {
        #[arg(short, long)]
        osm_pbf_file: String,

        #[arg(short, long)]
        key: String,

        #[arg(long)]
        value: String,

        #[arg(short, long)]
        features_output_path: String,
    },
    /// Reproject one coordinate pair between two named reference systems.
    Transform {
        #[arg(short, long)]
        source: String,

        #[arg(short, long)]
        dest: String,

        #[arg(allow_negative_numbers = true)]
        x: f64,

        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Args::parse();

    match cli.command {
        Commands::CountTags {
            osm_pbf_file,
            top,
            json,
        } => {
            let counts = extract::count_tags(&osm_pbf_file)?;
            log::info!("{} distinct tag pairs", counts.len());
            let counts = match top {
                Some(n) => TagCounts(counts.0.into_iter().take(n).collect()),
                None => counts,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&counts.0)?);
            } else {
                print_table(&counts.table());
            }
        }
        Commands::Extract {
            osm_pbf_file,
            key,
            value,
            features_output_path,
        } => {
            let data = extract::extract_tag(&osm_pbf_file, &key, &value)?;
            let batch = data.geoms();
            log::info!(
                "{} geometries for {}={}, {} skipped",
                batch.geoms.len(),
                key,
                value,
                batch.skipped
            );

            let geojson_str = extract::to_features(&batch)
                .iter()
                .map(|feature| feature.to_string())
                .collect::<Vec<String>>()
                .join("\n");

            std::fs::write(features_output_path, geojson_str)?;
        }
        Commands::Transform { source, dest, x, y } => {
            let source = proj::Crs::named(&source)?;
            let dest = proj::Crs::named(&dest)?;
            let transform = proj::build_transform(&source, &dest)?;
            let (ox, oy) = transform.apply(x, y)?;
            println!("{ox} {oy}");
        }
    }
    Ok(())
}

fn print_table(rows: &[Vec<String>]) {
    let columns = rows.first().map(|header| header.len()).unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| rows.iter().map(|row| row[i].len()).max().unwrap_or(0))
        .collect();
    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:width$}"))
            .collect::<Vec<String>>()
            .join("  ");
        println!("{}", line.trim_end());
    }
}
