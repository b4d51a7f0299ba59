use unotes_auth::settings::*;

fn main() {
    // Load settings from the default location
    let project_settings = parse_settings(None).unwrap();
    println!("Loaded settings: {:?}", project_settings);
    println!("Valid: {:?}", project_settings.validate().map_err(|e| e.to_string()));

    // Attempt to load from an invalid path (expected to fail)
    let is_err = parse_settings(Some("")).is_err();
    println!("Error on invalid path: {:?}", is_err);

    // Release settings ship without secrets and must fail validation
    // unless UNOTES__JWT__ACCESS_SECRET and UNOTES__JWT__REFRESH_SECRET are set.
    // $ cargo run --bin settings_demo -- --settings=settings/release.toml
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref()).unwrap();
    println!("Loaded settings: {:?}", project_settings);
    println!("Valid: {:?}", project_settings.validate().map_err(|e| e.to_string()));
}
