use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["aioscan-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["aioscan-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["aioscan-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn scan_takes_domain_and_optional_identity() {
    let cli = Cli::try_parse_from(["aioscan-cli", "scan", "example.com"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Scan { ref domain, identity: None }) if domain == "example.com"
    ));

    let cli = Cli::try_parse_from([
        "aioscan-cli",
        "scan",
        "https://www.example.com/",
        "--identity",
        "ops",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Scan { identity: Some(ref id), .. }) if id == "ops"
    ));
}

#[test]
fn scan_requires_a_domain() {
    assert!(Cli::try_parse_from(["aioscan-cli", "scan"]).is_err());
}

#[test]
fn lookup_takes_domain() {
    let cli = Cli::try_parse_from(["aioscan-cli", "lookup", "example.com"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Lookup { ref domain }) if domain == "example.com"
    ));
}

#[test]
fn parses_rebuild_command() {
    let cli = Cli::try_parse_from(["aioscan-cli", "rebuild"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Rebuild)));
}

#[test]
fn stats_reconcile_defaults_off() {
    let cli = Cli::try_parse_from(["aioscan-cli", "stats"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Stats { reconcile: false })
    ));

    let cli = Cli::try_parse_from(["aioscan-cli", "stats", "--reconcile"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Stats { reconcile: true })));
}
