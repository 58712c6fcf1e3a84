use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

pub fn setup_logging(verbose: bool) {
    let default_filter = if verbose {
        "raidtally=info"
    } else {
        "raidtally=warn"
    };

    let timer = LocalTime::new(time::macros::format_description!(
        "[hour]:[minute]:[second]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_timer(timer)
        .with_target(false)
        .init();
}

pub fn format_number(num: u64) -> String {
    num.to_string()
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.init_bosses {
        return Ok(());
    }

    if args.guild.is_none() {
        anyhow::bail!("--guild is required");
    }

    if args.from.is_none() || args.to.is_none() {
        anyhow::bail!("--from and --to are required");
    }

    if args.boss.is_none() {
        anyhow::bail!("--boss is required");
    }

    if !(1..=5).contains(&args.difficulty) {
        anyhow::bail!("--difficulty must be between 1 (LFR) and 5 (Mythic)");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}
