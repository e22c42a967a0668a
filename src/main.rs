use std::path::PathBuf;
use std::process::ExitCode;

use backdrop::EffectsConfig;

const USAGE: &str = "usage: backdrop [--interactable] [--config <path.json>] [--seed <u64>]";

#[derive(Debug, Default, PartialEq)]
struct Options {
    interactable: bool,
    config: Option<PathBuf>,
    seed: Option<u64>,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut options = Options::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--interactable" => options.interactable = true,
                "--config" => {
                    let path = args.next().ok_or("--config needs a path")?;
                    options.config = Some(PathBuf::from(path));
                }
                "--seed" => {
                    let value = args.next().ok_or("--seed needs a value")?;
                    let seed = value
                        .parse()
                        .map_err(|_| format!("invalid seed {:?}", value))?;
                    options.seed = Some(seed);
                }
                other => return Err(format!("unknown argument {:?}", other)),
            }
        }
        Ok(options)
    }

    fn into_config(self) -> Result<EffectsConfig, backdrop::ConfigError> {
        let mut config = match &self.config {
            Some(path) => EffectsConfig::load(path)?,
            None => EffectsConfig::default(),
        };
        if self.interactable {
            config = config.with_interactable(true);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("backdrop=info")).init();

    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("{}\n{}", msg, USAGE);
            return ExitCode::from(2);
        }
    };

    let result = options
        .into_config()
        .map_err(backdrop::EffectsError::from)
        .and_then(backdrop::app::run);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flags() {
        let options = Options::parse(args(&["--interactable", "--seed", "42"])).unwrap();
        assert!(options.interactable);
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.config, None);
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing() {
        assert!(Options::parse(args(&["--fast"])).is_err());
        assert!(Options::parse(args(&["--seed"])).is_err());
        assert!(Options::parse(args(&["--seed", "abc"])).is_err());
    }

    #[test]
    fn test_options_into_config() {
        let config = Options::parse(args(&["--seed", "7"])).unwrap().into_config().unwrap();
        assert_eq!(config.seed, Some(7));
        assert!(!config.scene.interactable);
    }
}
