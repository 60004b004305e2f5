//! The rendition ladder: which scales and bitrates to encode.

use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::error::Result;
use crate::Error;

/// One resolution label resolved against the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rung {
    /// Label as requested (e.g. `180p`).
    pub label: String,
    /// ffmpeg scale descriptor (e.g. `320x180`).
    pub scale: String,
    /// Bitrate strings in config order (e.g. `500k`).
    pub bitrates: Vec<String>,
}

/// Resolution label -> (scale, bitrates), iterated in the order requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitrateTable {
    rungs: Vec<Rung>,
}

impl BitrateTable {
    /// Look up every requested label in the config.
    ///
    /// Stops at the first label missing from either `[scale]` or `[bitrates]`
    /// with [`Error::ConfigLookup`].
    pub fn resolve(labels: &[String], config: &Config) -> Result<Self> {
        let mut rungs = Vec::with_capacity(labels.len());
        for label in labels {
            let scale = config
                .scale
                .get(label)
                .ok_or_else(|| Error::config_lookup(label, "scale"))?;
            let bitrates = config
                .bitrates
                .get(label)
                .ok_or_else(|| Error::config_lookup(label, "bitrates"))?
                .to_vec();
            tracing::debug!("{label}: scale={scale} bitrates={}", bitrates.join(","));
            rungs.push(Rung {
                label: label.clone(),
                scale: scale.clone(),
                bitrates,
            });
        }
        Ok(Self { rungs })
    }

    /// Rungs in request order.
    pub fn iter(&self) -> impl Iterator<Item = &Rung> {
        self.rungs.iter()
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }
}

impl FromIterator<Rung> for BitrateTable {
    fn from_iter<I: IntoIterator<Item = Rung>>(iter: I) -> Self {
        Self {
            rungs: iter.into_iter().collect(),
        }
    }
}

/// A bitrate of the form `<integer><unit>` as ffmpeg accepts it (`500k`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitrate {
    value: u64,
    unit: char,
}

impl Bitrate {
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn unit(&self) -> char {
        self.unit
    }

    /// Rate-control buffer: half the bitrate, same unit, rounded down.
    pub fn buffer_size(&self) -> Bitrate {
        Bitrate {
            value: self.value / 2,
            unit: self.unit,
        }
    }
}

impl FromStr for Bitrate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let unit = chars
            .next_back()
            .filter(char::is_ascii_alphabetic)
            .ok_or_else(|| Error::malformed_bitrate(s))?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::malformed_bitrate(s));
        }
        let value = digits.parse().map_err(|_| Error::malformed_bitrate(s))?;
        Ok(Self { value, unit })
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BitrateList;
    use assert_matches::assert_matches;

    fn config() -> Config {
        let mut config = Config::default();
        for (label, scale, rates) in [
            ("90p", "160x90", "200k"),
            ("180p", "320x180", "500k,800k"),
            ("360p", "640x360", "1200k"),
        ] {
            config.scale.insert(label.into(), scale.into());
            config
                .bitrates
                .insert(label.into(), BitrateList::Csv(rates.into()));
        }
        config
    }

    fn labels(l: &[&str]) -> Vec<String> {
        l.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolve_keeps_request_order() {
        // Config order is lexical (180p, 360p, 90p); the table must follow
        // the request instead.
        let table = BitrateTable::resolve(&labels(&["360p", "90p", "180p"]), &config()).unwrap();
        let order: Vec<&str> = table.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(order, vec!["360p", "90p", "180p"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn resolve_carries_scale_and_bitrates() {
        let table = BitrateTable::resolve(&labels(&["180p"]), &config()).unwrap();
        let rung = table.iter().next().unwrap();
        assert_eq!(rung.scale, "320x180");
        assert_eq!(rung.bitrates, vec!["500k", "800k"]);
    }

    #[test]
    fn unknown_label_names_the_label() {
        let err = BitrateTable::resolve(&labels(&["180p", "4k", "360p"]), &config()).unwrap_err();
        assert_matches!(err, Error::ConfigLookup { label, section } if label == "4k" && section == "scale");
    }

    #[test]
    fn label_without_bitrates_fails() {
        let mut config = config();
        config.bitrates.remove("90p");
        let err = BitrateTable::resolve(&labels(&["90p"]), &config).unwrap_err();
        assert_matches!(err, Error::ConfigLookup { section, .. } if section == "bitrates");
    }

    #[test]
    fn buffer_size_is_half_rounded_down() {
        for (rate, buf) in [("1000k", "500k"), ("1001k", "500k"), ("500k", "250k"), ("1k", "0k")] {
            let bitrate: Bitrate = rate.parse().unwrap();
            assert_eq!(bitrate.buffer_size().to_string(), buf, "{rate}");
        }
    }

    #[test]
    fn unit_suffix_is_kept() {
        let bitrate: Bitrate = "3M".parse().unwrap();
        assert_eq!(bitrate.value(), 3);
        assert_eq!(bitrate.unit(), 'M');
        assert_eq!(bitrate.buffer_size().to_string(), "1M");
        assert_eq!(bitrate.to_string(), "3M");
    }

    #[test]
    fn malformed_bitrates_never_default() {
        for bad in ["", "k", "500", "1.5k", "-500k", "+500k", "5 00k", "abck", "500k!"] {
            assert_matches!(
                bad.parse::<Bitrate>(),
                Err(Error::MalformedBitrate { value }) if value == bad,
                "{bad:?}"
            );
        }
    }

    #[test]
    fn overflowing_bitrate_is_malformed() {
        assert_matches!(
            "99999999999999999999999k".parse::<Bitrate>(),
            Err(Error::MalformedBitrate { .. })
        );
    }
}
