use anyhow::{anyhow, Context, Result};
use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version,
    AppSettings, Arg, ArgMatches, SubCommand,
};
use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::validators::*;
use tile_pyramid::{
    BoundingBox, Config, Credentials, Fixture, UrlFormat, DEFAULT_LAYER, IGN_WMTS_URL,
    SCAN_EXPRESS_STANDARD_LAYER,
};

const FETCH_CMD: &str = "fetch";
const ALIGN_CMD: &str = "align";
const JOIN_CMD: &str = "join";

const USER_ARG: &str = "user";
const PASSWORD_ARG: &str = "password";
const API_KEY_ARG: &str = "api_key";
const URL_ARG: &str = "url";
const LAYER_ARG: &str = "layer";
const SCAN_EXPRESS_ARG: &str = "layer_scan_express_standard";
const ZOOM_ARG: &str = "zoom";
const MIN_ZOOM_ARG: &str = "min_zoom";
const MAX_ZOOM_ARG: &str = "max_zoom";
const BBOX_FIXTURE_ARG: &str = "fixture";
const BBOX_NORTH_ARG: &str = "north";
const BBOX_SOUTH_ARG: &str = "south";
const BBOX_WEST_ARG: &str = "west";
const BBOX_EAST_ARG: &str = "east";
const OUTPUT_DIR_ARG: &str = "output_dir";
const MAP_NAME_ARG: &str = "map_name";
const TIMEOUT_ARG: &str = "timeout";
const PARALLEL_FETCHES_ARG: &str = "num_parallel";
const FETCH_EXISTING_ARG: &str = "should_fetch_existing";
const DRY_RUN_ARG: &str = "dry_run";
const WORKING_DIR_ARG: &str = "working_dir";
const EXTENSION_ARG: &str = "extension";
const LEVEL_DIR_ARG: &str = "level_dir";
const IMAGES_ARG: &str = "images";
const COLUMNS_ARG: &str = "columns";
const OUTPUT_ARG: &str = "output";

pub enum Command {
    Fetch(FetchArgs),
    Align(AlignArgs),
    Join(JoinArgs),
}

pub struct FetchArgs {
    pub bounding_box: BoundingBox,
    pub credentials: Option<Credentials>,
    pub api_key: String,
    pub url: String,
    pub layer: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub output_dir: PathBuf,
    pub map_name: String,
    pub parallel_fetches: u8,
    pub timeout: Duration,
    pub fetch_existing: bool,
    pub dry_run: bool,
}

pub struct AlignArgs {
    pub working_dir: PathBuf,
    pub map_name: String,
    pub extension: String,
}

pub enum JoinArgs {
    /// Join an aligned level folder, tiles placed by their numbers.
    Level { level_dir: PathBuf, output: PathBuf },
    /// Join a list of images, row-major.
    Images {
        images: Vec<PathBuf>,
        columns: u32,
        output: PathBuf,
    },
}

impl std::convert::From<FetchArgs> for Config {
    fn from(args: FetchArgs) -> Self {
        Self {
            bounding_box: args.bounding_box,
            credentials: args.credentials,
            layer: args.layer,
            fetch_existing: args.fetch_existing,
            fetch_rate: args.parallel_fetches,
            output_folder: args.output_dir,
            map_name: args.map_name,
            url: UrlFormat::new(args.url, args.api_key),
            extension: "jpg".to_owned(),
            timeout: args.timeout,
            min_zoom: args.min_zoom,
            max_zoom: args.max_zoom,
        }
    }
}

impl Command {
    pub fn parse() -> Result<Self> {
        let matches = get_matches();

        match matches.subcommand() {
            (FETCH_CMD, Some(sub)) => Ok(Command::Fetch(FetchArgs::from_matches(sub)?)),
            (ALIGN_CMD, Some(sub)) => Ok(Command::Align(AlignArgs::from_matches(sub))),
            (JOIN_CMD, Some(sub)) => Ok(Command::Join(JoinArgs::from_matches(sub)?)),
            (other, _) => Err(anyhow!("unknown command {:?}", other)),
        }
    }
}

/// Parses the value of an argument that clap already validated or defaulted.
fn value<T>(matches: &ArgMatches, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = matches
        .value_of(name)
        .ok_or_else(|| anyhow!("missing argument {}", name))?;

    raw.parse()
        .map_err(|e| anyhow!("invalid value {:?} for {}: {}", raw, name, e))
}

impl FetchArgs {
    fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let (min_zoom, max_zoom) = match matches.value_of(ZOOM_ARG) {
            // if `zoom` is set, use it for both min/max
            Some(_) => {
                let zoom = value(matches, ZOOM_ARG)?;
                (zoom, zoom)
            }
            // otherwise, parse min/max separately
            None => (
                value(matches, MIN_ZOOM_ARG)?,
                value(matches, MAX_ZOOM_ARG)?,
            ),
        };

        let bounding_box = match matches.value_of(BBOX_FIXTURE_ARG) {
            // if a fixture is specified, construct the bounding box from that
            Some(_) => value::<Fixture>(matches, BBOX_FIXTURE_ARG)?.into(),
            // otherwise, parse the 4 coords separately
            None => BoundingBox::new(
                value(matches, BBOX_NORTH_ARG)?,
                value(matches, BBOX_WEST_ARG)?,
                value(matches, BBOX_SOUTH_ARG)?,
                value(matches, BBOX_EAST_ARG)?,
            )
            .context("invalid bounding box")?,
        };

        let layer = if matches.is_present(SCAN_EXPRESS_ARG) {
            SCAN_EXPRESS_STANDARD_LAYER.to_owned()
        } else {
            matches.value_of(LAYER_ARG).unwrap_or(DEFAULT_LAYER).to_owned()
        };

        let credentials = match (matches.value_of(USER_ARG), matches.value_of(PASSWORD_ARG)) {
            (Some(user), Some(password)) => Some(Credentials {
                user: user.to_owned(),
                password: password.to_owned(),
            }),
            _ => None,
        };

        Ok(Self {
            min_zoom,
            max_zoom,
            bounding_box,
            credentials,
            layer,
            api_key: matches.value_of(API_KEY_ARG).unwrap_or_default().to_owned(),
            url: value(matches, URL_ARG)?,
            output_dir: value(matches, OUTPUT_DIR_ARG)?,
            map_name: value(matches, MAP_NAME_ARG)?,
            parallel_fetches: value(matches, PARALLEL_FETCHES_ARG)?,
            timeout: Duration::from_secs(value(matches, TIMEOUT_ARG)?),
            fetch_existing: matches.is_present(FETCH_EXISTING_ARG),
            dry_run: matches.is_present(DRY_RUN_ARG),
        })
    }
}

impl AlignArgs {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            working_dir: PathBuf::from(matches.value_of(WORKING_DIR_ARG).unwrap_or(".")),
            map_name: matches.value_of(MAP_NAME_ARG).unwrap_or("map").to_owned(),
            extension: matches.value_of(EXTENSION_ARG).unwrap_or("png").to_owned(),
        }
    }
}

impl JoinArgs {
    fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let output = value(matches, OUTPUT_ARG)?;

        match matches.value_of(LEVEL_DIR_ARG) {
            Some(level_dir) => Ok(JoinArgs::Level {
                level_dir: level_dir.into(),
                output,
            }),
            None => Ok(JoinArgs::Images {
                images: matches
                    .values_of(IMAGES_ARG)
                    .map(|values| values.map(PathBuf::from).collect())
                    .unwrap_or_default(),
                columns: value(matches, COLUMNS_ARG)?,
                output,
            }),
        }
    }
}

fn get_matches() -> ArgMatches<'static> {
    app_from_crate!()
        .setting(AppSettings::GlobalVersion)
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(fetch_command())
        .subcommand(align_command())
        .subcommand(join_command())
        .get_matches()
}

fn fetch_command() -> clap::App<'static, 'static> {
    SubCommand::with_name(FETCH_CMD)
        .about("Fetch the tiles of a bounding box from a WMTS service")
        .arg(
            Arg::with_name(USER_ARG)
                .help("The user name for basic authentication")
                .env("WMTS_USER")
                .takes_value(true)
                .requires(PASSWORD_ARG)
                .long("user"),
        )
        .arg(
            Arg::with_name(PASSWORD_ARG)
                .help("The password for basic authentication")
                .env("WMTS_PASSWORD")
                .hide_env_values(true)
                .takes_value(true)
                .requires(USER_ARG)
                .long("password"),
        )
        .arg(
            Arg::with_name(API_KEY_ARG)
                .help("The API key of the service, substituted for `{api_key}` in the URL")
                .env("WMTS_API_KEY")
                .hide_env_values(true)
                .takes_value(true)
                .long("api-key"),
        )
        .arg(
            Arg::with_name(URL_ARG)
                .help("The GetTile URL with format specifiers `{api_key}`, `{layer}`, `{zoom}`, `{row}` and `{col}`. Defaults to the IGN Géoportail.")
                .default_value(IGN_WMTS_URL)
                .takes_value(true)
                .short("u")
                .long("url"),
        )
        .arg(
            Arg::with_name(LAYER_ARG)
                .help("The layer to fetch [default: GEOGRAPHICALGRIDSYSTEMS.MAPS]")
                .takes_value(true)
                .long("layer"),
        )
        .arg(
            Arg::with_name(SCAN_EXPRESS_ARG)
                .help("Use the GEOGRAPHICALGRIDSYSTEMS.MAPS.SCAN-EXPRESS.STANDARD layer (IGN maps in pastel colors)")
                .takes_value(false)
                .conflicts_with(LAYER_ARG)
                .long("layer-scan-express-standard"),
        )
        .arg(
            Arg::with_name(MIN_ZOOM_ARG)
                .help("The minimum zoom level to fetch")
                .validator(is_zoom)
                .required_unless(ZOOM_ARG)
                .takes_value(true)
                .long("zmin"),
        )
        .arg(
            Arg::with_name(MAX_ZOOM_ARG)
                .help("The maximum zoom level to fetch")
                .validator(is_zoom)
                .required_unless(ZOOM_ARG)
                .takes_value(true)
                .long("zmax"),
        )
        .arg(
            Arg::with_name(ZOOM_ARG)
                .help("Only fetch a single zoom level (implies zmin=x/zmax=x)")
                .validator(is_zoom)
                .conflicts_with_all(&[MIN_ZOOM_ARG, MAX_ZOOM_ARG])
                .takes_value(true)
                .short("z")
                .long("zoom"),
        )
        .arg(
            Arg::with_name(BBOX_NORTH_ARG)
                .help("Latitude of north bounding box boundary (in degrees)")
                .required_unless(BBOX_FIXTURE_ARG)
                .validator(is_latitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .short("n")
                .long("north"),
        )
        .arg(
            Arg::with_name(BBOX_SOUTH_ARG)
                .help("Latitude of south bounding box boundary (in degrees)")
                .required_unless(BBOX_FIXTURE_ARG)
                .validator(is_latitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .short("s")
                .long("south"),
        )
        .arg(
            Arg::with_name(BBOX_EAST_ARG)
                .help("Longitude of east bounding box boundary (in degrees)")
                .required_unless(BBOX_FIXTURE_ARG)
                .validator(is_longitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .short("e")
                .long("east"),
        )
        .arg(
            Arg::with_name(BBOX_WEST_ARG)
                .help("Longitude of west bounding box boundary (in degrees)")
                .required_unless(BBOX_FIXTURE_ARG)
                .validator(is_longitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .short("w")
                .long("west"),
        )
        .arg(
            Arg::with_name(BBOX_FIXTURE_ARG)
                .help("Use a known, named bounding box (reunion-est, bali-centre)")
                .validator(is_bb_fixture)
                .conflicts_with_all(&[BBOX_NORTH_ARG, BBOX_SOUTH_ARG, BBOX_EAST_ARG, BBOX_WEST_ARG])
                .takes_value(true)
                .short("f")
                .long("fixture"),
        )
        .arg(
            Arg::with_name(OUTPUT_DIR_ARG)
                .help("The folder in which the map folder is created")
                .default_value(".")
                .takes_value(true)
                .short("o")
                .long("output"),
        )
        .arg(
            Arg::with_name(MAP_NAME_ARG)
                .help("The name of the map folder")
                .default_value("map")
                .takes_value(true)
                .long("mapname"),
        )
        .arg(
            Arg::with_name(PARALLEL_FETCHES_ARG)
                .help("The amount of tiles fetched in parallel.")
                .validator(is_numeric_min(1))
                .default_value("1")
                .takes_value(true)
                .short("r")
                .long("rate"),
        )
        .arg(
            Arg::with_name(TIMEOUT_ARG)
                .help("The timeout (in seconds) for fetching a single tile. Pass 0 for no timeout.")
                .validator(is_numeric_min(0))
                .default_value("0")
                .takes_value(true)
                .short("t")
                .long("timeout"),
        )
        .arg(
            Arg::with_name(FETCH_EXISTING_ARG)
                .help("Fetch tiles that we've already downloaded")
                .takes_value(false)
                .long("fetch-existing"),
        )
        .arg(
            Arg::with_name(DRY_RUN_ARG)
                .help("Don't actually fetch anything, just determine how many tiles would be fetched.")
                .takes_value(false)
                .long("dry-run"),
        )
}

fn align_command() -> clap::App<'static, 'static> {
    SubCommand::with_name(ALIGN_CMD)
        .about("Re-index an OpenStreetMap tile tree into zero-based, aligned levels")
        .arg(
            Arg::with_name(WORKING_DIR_ARG)
                .help("The folder containing the zoom level folders (12, 13, ...)")
                .default_value(".")
                .takes_value(true)
                .long("wd"),
        )
        .arg(
            Arg::with_name(MAP_NAME_ARG)
                .help("The name of the folder created under the working directory")
                .default_value("map")
                .takes_value(true)
                .long("mapname"),
        )
        .arg(
            Arg::with_name(EXTENSION_ARG)
                .help("The extension of the written tiles")
                .default_value("png")
                .takes_value(true)
                .long("extension"),
        )
}

fn join_command() -> clap::App<'static, 'static> {
    SubCommand::with_name(JOIN_CMD)
        .about("Stitch equally sized tiles into a single image")
        .arg(
            Arg::with_name(LEVEL_DIR_ARG)
                .help("An aligned level folder (<row>/<col>.<ext>) to join")
                .takes_value(true)
                .conflicts_with_all(&[IMAGES_ARG, COLUMNS_ARG])
                .long("level-dir"),
        )
        .arg(
            Arg::with_name(COLUMNS_ARG)
                .help("The number of images per row")
                .validator(is_numeric_min(1))
                .required_unless(LEVEL_DIR_ARG)
                .takes_value(true)
                .short("c")
                .long("columns"),
        )
        .arg(
            Arg::with_name(OUTPUT_ARG)
                .help("The image to write")
                .required(true)
                .takes_value(true)
                .short("o")
                .long("output"),
        )
        .arg(
            Arg::with_name(IMAGES_ARG)
                .help("The images to join, row-major")
                .required_unless(LEVEL_DIR_ARG)
                .multiple(true),
        )
}
