use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["pricewatch", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Db {
            command: DbCommands::Ping
        }
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["pricewatch", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Db {
            command: DbCommands::Migrate
        }
    ));
}

#[test]
fn no_command_is_an_error() {
    assert!(Cli::try_parse_from(["pricewatch"]).is_err());
}

#[test]
fn items_add_defaults_to_css_and_detected_name() {
    let cli = Cli::try_parse_from(["pricewatch", "items", "add", "https://shop.example.com/lamp"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Items {
            command: ItemsCommands::Add {
                ref url,
                name: None,
                locator: None,
                ref locator_kind,
            }
        } if url == "https://shop.example.com/lamp" && locator_kind == "css"
    ));
}

#[test]
fn items_add_with_xpath_locator() {
    let cli = Cli::try_parse_from([
        "pricewatch",
        "items",
        "add",
        "https://shop.example.com/lamp",
        "--name",
        "Lamp",
        "--locator",
        "//span[@id='price']",
        "--locator-kind",
        "xpath",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Items {
            command: ItemsCommands::Add {
                name: Some(ref n),
                locator: Some(ref l),
                ref locator_kind,
                ..
            }
        } if n == "Lamp" && l == "//span[@id='price']" && locator_kind == "xpath"
    ));
}

#[test]
fn items_show_default_limit() {
    let cli = Cli::try_parse_from(["pricewatch", "items", "show", "4"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Items {
            command: ItemsCommands::Show { id: 4, limit: 20 }
        }
    ));
}

#[test]
fn items_set_locator_with_check() {
    let cli = Cli::try_parse_from([
        "pricewatch",
        "items",
        "set-locator",
        "4",
        ".price::text",
        "--check",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Items {
            command: ItemsCommands::SetLocator {
                id: 4,
                ref query,
                check: true,
                ..
            }
        } if query == ".price::text"
    ));
}

#[test]
fn items_remove_requires_numeric_id() {
    assert!(Cli::try_parse_from(["pricewatch", "items", "remove", "lamp"]).is_err());
    let cli = Cli::try_parse_from(["pricewatch", "items", "remove", "9"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Items {
            command: ItemsCommands::Remove { id: 9 }
        }
    ));
}

#[test]
fn check_all_and_single_item() {
    let all = Cli::try_parse_from(["pricewatch", "check"]).unwrap();
    assert!(matches!(all.command, Commands::Check { item: None }));

    let one = Cli::try_parse_from(["pricewatch", "check", "--item", "3"]).unwrap();
    assert!(matches!(one.command, Commands::Check { item: Some(3) }));
}

#[test]
fn extract_needs_exactly_one_source() {
    assert!(Cli::try_parse_from(["pricewatch", "extract"]).is_err());
    assert!(Cli::try_parse_from([
        "pricewatch",
        "extract",
        "--url",
        "https://shop.example.com",
        "--file",
        "page.html",
    ])
    .is_err());

    let cli = Cli::try_parse_from(["pricewatch", "extract", "--file", "page.html"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Extract {
            url: None,
            file: Some(_),
            ..
        }
    ));
}

#[test]
fn parses_detect_name_and_watch() {
    let cli = Cli::try_parse_from(["pricewatch", "detect-name", "https://shop.example.com/x"])
        .unwrap();
    assert!(matches!(cli.command, Commands::DetectName { ref url } if url.ends_with("/x")));

    let cli = Cli::try_parse_from(["pricewatch", "watch"]).unwrap();
    assert!(matches!(cli.command, Commands::Watch));
}
