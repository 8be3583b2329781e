use crate::cli::Context;
use crate::error::Result;
use crate::months::MonthCatalog;
use crate::settings::save_settings_to;

pub fn run(mut ctx: Context, billing_categories: &[String]) -> Result<()> {
    if !billing_categories.is_empty() {
        ctx.settings.billing_categories = billing_categories.to_vec();
    }
    // Reject a bad window before it is persisted.
    MonthCatalog::new(&ctx.settings.ordering())?;

    save_settings_to(&ctx.settings, &ctx.settings_path)?;
    println!("Saved settings to {}", ctx.settings_path.display());
    println!("  Source:  {}", ctx.settings.workbook);
    match &ctx.settings.month_window {
        Some(window) => println!("  Months:  {}", window.join(", ")),
        None => println!("  Months:  Janeiro..Dezembro"),
    }
    println!("  Billing: {}", ctx.settings.billing_categories.join(", "));
    Ok(())
}
