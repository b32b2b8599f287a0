//! Reply text for inventory operations.
//!
//! Output uses WhatsApp markup (`*bold*`). Every function returns a
//! non-empty string; missing pricing renders a placeholder instead of failing.

use super::{Pricing, RateTier, Tool};

/// Placeholder shown for tools without pricing data.
pub const NO_RATE_INFO: &str = "No rate info";

/// Render a price or duration without a trailing `.0`.
pub fn format_amount(value: f64) -> String {
    format!("{value}")
}

fn format_hours(hours: f64) -> String {
    if hours == 1.0 {
        "1 hour".to_owned()
    } else {
        format!("{} hours", format_amount(hours))
    }
}

fn format_tier(tier: &RateTier) -> String {
    format!(
        "• {} → {}",
        format_hours(tier.hours),
        format_amount(tier.price)
    )
}

/// Render the pricing lines for a tool.
pub fn render_pricing(pricing: &Pricing) -> String {
    match pricing {
        Pricing::Flat {
            price,
            duration_minutes: Some(minutes),
        } => format!("Price: {} for {minutes} min", format_amount(*price)),
        Pricing::Flat {
            price,
            duration_minutes: None,
        } => format!("Price: {}", format_amount(*price)),
        Pricing::Tiered(tiers) => tiers
            .iter()
            .map(format_tier)
            .collect::<Vec<_>>()
            .join("\n"),
        Pricing::Unpriced => NO_RATE_INFO.to_owned(),
    }
}

/// Render one tool: name, status glyph and label, then pricing.
pub fn render_tool(tool: &Tool) -> String {
    format!(
        "*{name}* {glyph} {label}\n{pricing}",
        name = tool.name,
        glyph = tool.status.glyph(),
        label = tool.status.label(),
        pricing = render_pricing(&tool.pricing),
    )
}

/// Render the full catalog listing.
pub fn render_catalog(tools: &[Tool]) -> String {
    if tools.is_empty() {
        return "No tools in the catalog yet.".to_owned();
    }

    let blocks: Vec<String> = tools.iter().map(render_tool).collect();
    format!(
        "🛠 *Tools for rent*\n\n{}\n\nSend /<name>_status for details or /rent_tool <name> to rent.",
        blocks.join("\n\n")
    )
}

/// Reply for a name with no matching record.
pub fn not_found(name: &str) -> String {
    format!("❓ Tool \"{name}\" not found. Check the spelling or send /tool_rental to see the list.")
}

/// Reply after a successful rental.
pub fn rented(tool: &Tool) -> String {
    format!(
        "✅ You rented *{name}*.\n{pricing}\nSend /return_tool {name} when you are done.",
        name = tool.name,
        pricing = render_pricing(&tool.pricing),
    )
}

/// Reply when the tool is already rented out.
pub fn already_in_use(tool: &Tool) -> String {
    format!(
        "❌ *{}* is currently in use. Check back later or send /tool_rental for other tools.",
        tool.name
    )
}

/// Reply after a successful return.
pub fn returned(tool: &Tool) -> String {
    format!(
        "🙏 Thanks for returning *{}*! It is available again.",
        tool.name
    )
}

/// Reply when returning a tool that is not rented.
pub fn not_rented(tool: &Tool) -> String {
    format!("ℹ️ *{}* is not currently rented.", tool.name)
}
