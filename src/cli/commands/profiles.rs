//! Store profile listing.

use console::style;

use crate::config::ServiceConfig;

/// List configured store profiles in routing order.
pub fn cmd_profiles(config: &ServiceConfig) -> anyhow::Result<()> {
    let router = config.build_router()?;

    println!(
        "\n{} ({:?} matching)",
        style("Store Profiles").bold(),
        router.mode()
    );
    println!("{}", "-".repeat(70));
    println!("{:<28} {:<24} Labels", "Token", "Name");
    println!("{}", "-".repeat(70));

    for profile in router.profiles() {
        let mut labels: Vec<&str> = profile
            .profile()
            .selectors
            .iter()
            .map(|s| s.label())
            .collect();
        if let Some(scan) = profile.row_scan() {
            labels.push(scan.label());
        }

        println!(
            "{:<28} {:<24} {}",
            profile.token(),
            profile.profile().name,
            labels.join(", ")
        );
    }

    Ok(())
}
