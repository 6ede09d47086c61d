//! Startup configuration: a hand-rolled `--flag=value` parser, following the
//! teacher's own preference for explicit structs with `from_args`/`from_env`
//! constructors over a derive-macro argument parser.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown option {0:?}")]
    UnknownOption(String),
    #[error("invalid value for {option}: {value:?}")]
    InvalidValue { option: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    Local,
    Client,
    Server,
    /// Hosts a server and also plays locally against it in the same
    /// process, for a couch host who wants other players to be able to
    /// join over the network.
    WithServer,
}

impl NetworkMode {
    fn parse(s: &str) -> Option<NetworkMode> {
        Some(match s {
            "local" => NetworkMode::Local,
            "client" => NetworkMode::Client,
            "server" => NetworkMode::Server,
            "with-server" | "with_server" => NetworkMode::WithServer,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub network_mode: NetworkMode,
    pub player_number: usize,
    pub replay_path: Option<String>,
    pub log_path: Option<String>,
    pub server_url: Option<String>,
    pub port: u16,
    pub autorecord: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            network_mode: NetworkMode::Local,
            player_number: 0,
            replay_path: None,
            log_path: None,
            server_url: None,
            port: 9001,
            autorecord: false,
        }
    }
}

impl Config {
    /// Parses `--network_mode=`, `--player_number=`, `--replay_path=`,
    /// `--log_path=`, `--server_url=`, `--port=`, `--autorecord=`; every flag
    /// is optional and unrecognized ones are a `ConfigError`, not a silent
    /// ignore — a typo'd flag should fail at startup, not at game time.
    pub fn from_args(args: impl Iterator<Item = String>) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        for arg in args {
            let Some(rest) = arg.strip_prefix("--") else {
                return Err(ConfigError::UnknownOption(arg));
            };
            let (option, value) = match rest.split_once('=') {
                Some((o, v)) => (o, v),
                None => return Err(ConfigError::InvalidValue { option: rest.to_string(), value: String::new() }),
            };

            match option {
                "network_mode" => {
                    config.network_mode = NetworkMode::parse(value)
                        .ok_or_else(|| ConfigError::InvalidValue { option: option.to_string(), value: value.to_string() })?;
                }
                "player_number" => {
                    config.player_number = value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue { option: option.to_string(), value: value.to_string() })?;
                }
                "replay_path" => config.replay_path = Some(value.to_string()),
                "log_path" => config.log_path = Some(value.to_string()),
                "server_url" => config.server_url = Some(value.to_string()),
                "port" => {
                    config.port = value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue { option: option.to_string(), value: value.to_string() })?;
                }
                "autorecord" => {
                    config.autorecord = match value {
                        "true" | "1" => true,
                        "false" | "0" => false,
                        _ => return Err(ConfigError::InvalidValue { option: option.to_string(), value: value.to_string() }),
                    };
                }
                other => return Err(ConfigError::UnknownOption(other.to_string())),
            }
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        ([0, 0, 0, 0], self.port).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> impl Iterator<Item = String> {
        items.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn defaults_to_local_single_player() {
        let config = Config::from_args(args(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_every_recognized_flag() {
        let config = Config::from_args(args(&[
            "--network_mode=server",
            "--player_number=1",
            "--replay_path=match.replay",
            "--log_path=game.log",
            "--server_url=example.com",
            "--port=4242",
            "--autorecord=true",
        ]))
        .unwrap();

        assert_eq!(config.network_mode, NetworkMode::Server);
        assert_eq!(config.player_number, 1);
        assert_eq!(config.replay_path.as_deref(), Some("match.replay"));
        assert_eq!(config.log_path.as_deref(), Some("game.log"));
        assert_eq!(config.server_url.as_deref(), Some("example.com"));
        assert_eq!(config.port, 4242);
        assert!(config.autorecord);
    }

    #[test]
    fn rejects_unknown_flag() {
        let err = Config::from_args(args(&["--bogus=1"])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownOption("bogus".to_string()));
    }

    #[test]
    fn parses_with_server_mode() {
        let config = Config::from_args(args(&["--network_mode=with-server"])).unwrap();
        assert_eq!(config.network_mode, NetworkMode::WithServer);
    }

    #[test]
    fn rejects_invalid_network_mode() {
        let err = Config::from_args(args(&["--network_mode=carrier_pigeon"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_non_numeric_port() {
        let err = Config::from_args(args(&["--port=not_a_number"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
