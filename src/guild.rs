use url::Url;

use crate::error::{Error, Result};

/// Accepts either a bare numeric guild id or a guild page URL such as
/// https://www.warcraftlogs.com/guild/id/260153.
pub fn parse_guild_id(input: &str) -> Result<u32> {
    let input = input.trim();
    if let Ok(id) = input.parse::<u32>() {
        return Ok(id);
    }

    let parsed = Url::parse(input).map_err(|_| {
        Error::InvalidArgument(format!("'{input}' is neither a guild id nor a guild URL"))
    })?;

    // The id follows an "id" path segment: /guild/id/260153
    let mut segments = parsed
        .path_segments()
        .ok_or_else(|| Error::InvalidArgument(format!("guild URL '{input}' has no path")))?;

    while let Some(segment) = segments.next() {
        if segment == "id" {
            return match segments.next().map(str::parse) {
                Some(Ok(id)) => Ok(id),
                _ => Err(Error::InvalidArgument(format!(
                    "could not parse a guild id from '{input}'"
                ))),
            };
        }
    }

    Err(Error::InvalidArgument(format!(
        "could not parse a guild id from '{input}' (expected .../guild/id/<number>)"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_id() {
        assert_eq!(parse_guild_id("260153").unwrap(), 260153);
        assert_eq!(parse_guild_id(" 42 ").unwrap(), 42);
    }

    #[test]
    fn accepts_guild_url() {
        let id = parse_guild_id("https://www.warcraftlogs.com/guild/id/260153").unwrap();
        assert_eq!(id, 260153);
    }

    #[test]
    fn accepts_guild_url_with_trailing_segments() {
        let id = parse_guild_id("https://www.warcraftlogs.com/guild/id/260153/reports").unwrap();
        assert_eq!(id, 260153);
    }

    #[test]
    fn rejects_url_without_id_segment() {
        assert!(parse_guild_id("https://www.warcraftlogs.com/guild/eu/some-realm").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_guild_id("not a guild").is_err());
        assert!(parse_guild_id("https://www.warcraftlogs.com/guild/id/notanumber").is_err());
    }
}
