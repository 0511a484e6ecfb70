use std::path::{Path, PathBuf};

#[derive(Debug, Default, PartialEq)]
pub struct CliOptions {
    pub filename: Option<PathBuf>,
    pub save: bool,
    pub output: Option<PathBuf>,
    pub plot: bool,
    /// 1-based channel numbers; empty means all.
    pub channels: Vec<usize>,
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub help: bool,
}

impl CliOptions {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-s" | "--save" => options.save = true,
                "-p" | "--plot" => options.plot = true,
                "-v" | "--verbose" => options.verbose = true,
                "-h" | "--help" => options.help = true,
                "-o" | "--output" => {
                    let value = args.next().ok_or("Missing value for --output")?;
                    options.output = Some(PathBuf::from(value));
                }
                "-c" | "--channels" => {
                    let value = args.next().ok_or("Missing value for --channels")?;
                    options.channels = parse_channels(&value)?;
                }
                "--config" => {
                    let value = args.next().ok_or("Missing value for --config")?;
                    options.config = Some(PathBuf::from(value));
                }
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(format!("Unknown option '{}'", flag));
                }
                _ => {
                    if options.filename.is_some() {
                        return Err(format!("Unexpected argument '{}'", arg));
                    }
                    options.filename = Some(PathBuf::from(arg));
                }
            }
        }

        Ok(options)
    }

    /// Export requested, either explicitly or by naming an output file.
    pub fn wants_save(&self) -> bool {
        self.save || self.output.is_some()
    }

    /// A channel list that the export will not honour. The JSON dump always
    /// carries every channel.
    pub fn channels_ignored_by_export(&self) -> bool {
        !self.channels.is_empty()
            && self.wants_save()
            && self.output.as_deref().map(is_json_path).unwrap_or(false)
    }
}

pub fn is_json_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn parse_channels(value: &str) -> Result<Vec<usize>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| format!("Invalid channel number '{}'", s))
        })
        .collect()
}

pub fn usage() -> String {
    [
        "Usage: ks2_reader [options] filename",
        "",
        "Options:",
        "  -s, --save              Export data file",
        "  -o, --output FILE       Export file name (.csv or .json, default <file>.csv)",
        "  -p, --plot              Print per-channel min/max/mean of measured data",
        "  -c, --channels LIST     Channels, comma separated, 1-based",
        "      --config FILE       Reader configuration (JSON, default ks2.json)",
        "  -v, --verbose           Debug logging",
        "  -h, --help              Show this message",
    ]
    .join("\n")
}
