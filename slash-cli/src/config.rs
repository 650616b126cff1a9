//! `key = value[, value...]` config file parsing (E1), grounded on
//! `Config.cpp`'s grammar but implemented with a small hand-written
//! tokenizer instead of its five regexes -- reaching for a regex crate
//! nothing else in the stack needs would be its own kind of dependency
//! fabrication.
use crate::error::{CliError, Result};
use fnv::FnvHashMap;
use std::path::Path;

/// The raw `key -> [value, value, ...]` table, values kept as their
/// original string tokens so callers pick int/string parsing per key.
pub struct Config {
    vars: FnvHashMap<String, Vec<String>>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut vars = FnvHashMap::default();

        for (lineno, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let eq = line.find('=').ok_or_else(|| {
                CliError::Config(format!("line {}: missing '=' in {:?}", lineno + 1, raw_line))
            })?;
            let key = line[..eq].trim().to_string();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "line {}: empty key in {:?}",
                    lineno + 1,
                    raw_line
                )));
            }
            let values: Vec<String> = line[eq + 1..]
                .split(',')
                .map(|v| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                .collect();
            if values.iter().any(|v| v.is_empty()) {
                return Err(CliError::Config(format!(
                    "line {}: empty value in {:?}",
                    lineno + 1,
                    raw_line
                )));
            }
            vars.insert(key, values);
        }

        Ok(Config { vars })
    }

    fn values(&self, key: &str) -> Result<&[String]> {
        self.vars
            .get(key)
            .map(|v| v.as_slice())
            .ok_or_else(|| CliError::Config(format!("missing config key {:?}", key)))
    }

    pub fn int_val(&self, key: &str, index: usize) -> Result<u64> {
        let values = self.values(key)?;
        values
            .get(index)
            .ok_or_else(|| CliError::Config(format!("{:?} has no value at index {}", key, index)))?
            .parse::<u64>()
            .map_err(|_| CliError::Config(format!("{:?} is not an integer", key)))
    }

    pub fn str_val(&self, key: &str, index: usize) -> Result<&str> {
        let values = self.values(key)?;
        values
            .get(index)
            .map(|s| s.as_str())
            .ok_or_else(|| CliError::Config(format!("{:?} has no value at index {}", key, index)))
    }

    pub fn int_val_or(&self, key: &str, index: usize, default: u64) -> u64 {
        self.int_val(key, index).unwrap_or(default)
    }
}

/// The typed scalars the core index and CLI driver need (spec.md section
/// 6), plus the original's supplemental `ground_truth_file`/`world_size`.
#[derive(Clone)]
pub struct SlashConfig {
    pub k: usize,
    pub l: usize,
    pub range_pow: u32,
    pub reservoir_size: usize,
    pub n: usize,
    pub q: usize,
    pub topk: usize,
    pub avg_dim: usize,
    pub batch_size: usize,
    pub data_file: String,
    pub query_file: String,
    pub ground_truth_file: Option<String>,
    pub world_size: usize,
}

impl SlashConfig {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(SlashConfig {
            k: cfg.int_val("k", 0)? as usize,
            l: cfg.int_val("l", 0)? as usize,
            range_pow: cfg.int_val("range_pow", 0)? as u32,
            reservoir_size: cfg.int_val("reservoir_size", 0)? as usize,
            n: cfg.int_val("n", 0)? as usize,
            q: cfg.int_val("q", 0)? as usize,
            topk: cfg.int_val("topk", 0)? as usize,
            avg_dim: cfg.int_val("avg_dim", 0)? as usize,
            batch_size: cfg.int_val("batch_size", 0)? as usize,
            data_file: cfg.str_val("data_file", 0)?.to_string(),
            query_file: cfg.str_val("query_file", 0)?.to_string(),
            ground_truth_file: cfg.str_val("ground_truth_file", 0).ok().map(|s| s.to_string()),
            world_size: cfg.int_val_or("world_size", 0, 1) as usize,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("slash_config_test_{}.cfg", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parses_ints_and_strings_and_skips_comments() {
        let path = write_temp(
            "// a comment\n\nk = 2\nl = 16\nrange_pow = 10\nreservoir_size = 4\n\
             n = 100\nq = 10\ntopk = 1\navg_dim = 5\nbatch_size = 32\n\
             data_file = \"data.svm\"\nquery_file = \"query.svm\"\n",
        );
        let cfg = Config::from_file(&path).unwrap();
        let slash_cfg = SlashConfig::from_config(&cfg).unwrap();
        assert_eq!(slash_cfg.k, 2);
        assert_eq!(slash_cfg.l, 16);
        assert_eq!(slash_cfg.data_file, "data.svm");
        assert_eq!(slash_cfg.world_size, 1);
        assert!(slash_cfg.ground_truth_file.is_none());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_equals_is_an_error() {
        let path = write_temp("not_a_kv_line\n");
        assert!(Config::from_file(&path).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_multi_value_key() {
        let path = write_temp("labels = 1, 2, 3\n");
        let cfg = Config::from_file(&path).unwrap();
        assert_eq!(cfg.int_val("labels", 0).unwrap(), 1);
        assert_eq!(cfg.int_val("labels", 2).unwrap(), 3);
        std::fs::remove_file(path).ok();
    }
}
