mod args;
mod validators;

use anyhow::Result;
use args::{Command, FetchArgs, JoinArgs};
use tile_pyramid::{align, fetch, grid, join_level, join_tiles, Config, Estimate};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Command::parse()? {
        Command::Fetch(args) => run_fetch(args).await,
        Command::Align(args) => {
            log::info!("working directory set to {}", args.working_dir.display());
            align(&args.working_dir, &args.map_name, &args.extension)?;
            Ok(())
        }
        Command::Join(JoinArgs::Level { level_dir, output }) => {
            join_level(&level_dir, &output)?;
            Ok(())
        }
        Command::Join(JoinArgs::Images {
            images,
            columns,
            output,
        }) => {
            join_tiles(&images, columns, &output)?;
            Ok(())
        }
    }
}

async fn run_fetch(args: FetchArgs) -> Result<()> {
    let dry_run = args.dry_run;
    let config: Config = args.into();

    if dry_run {
        let levels = config.levels()?;
        for (index, level) in levels.iter().enumerate() {
            eprintln!(
                "level {} (zoom {}): rows {}..={}, cols {}..={}",
                index,
                level.zoom,
                level.grid.row_top,
                level.grid.row_bot,
                level.grid.col_left,
                level.grid.col_right
            );
        }

        let (top_left, bottom_right) = grid::calibration_points(&levels[0]);
        eprintln!(
            "calibration: top left ({}, {}), bottom right ({}, {})",
            top_left.proj_x, top_left.proj_y, bottom_right.proj_x, bottom_right.proj_y
        );
        eprintln!("would download {}", Estimate::for_levels(&levels));

        Ok(())
    } else {
        let summary = fetch(config).await?;
        if summary.failed > 0 {
            log::warn!("{} tiles could not be fetched", summary.failed);
        }
        Ok(())
    }
}
