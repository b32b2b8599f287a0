//! Tests for `inventory::render`.

use toolrent::inventory::render::{render_catalog, render_pricing, render_tool, NO_RATE_INFO};
use toolrent::inventory::{Pricing, RateTier, Tool, ToolStatus};

#[test]
fn flat_pricing_shows_price_and_duration() {
    let tool = Tool::new(
        "UnlockTool",
        ToolStatus::Available,
        Pricing::Flat {
            price: 20.0,
            duration_minutes: Some(30),
        },
    );
    assert_eq!(
        render_tool(&tool),
        "*UnlockTool* ✅ Available\nPrice: 20 for 30 min"
    );
}

#[test]
fn flat_pricing_without_duration() {
    let pricing = Pricing::Flat {
        price: 7.5,
        duration_minutes: None,
    };
    assert_eq!(render_pricing(&pricing), "Price: 7.5");
}

#[test]
fn tiered_pricing_lists_tiers_in_ascending_hours() {
    let tool = Tool::new(
        "Drill",
        ToolStatus::InUse,
        Pricing::tiered([
            RateTier {
                hours: 24.0,
                price: 60.0,
            },
            RateTier {
                hours: 1.0,
                price: 10.0,
            },
            RateTier {
                hours: 4.0,
                price: 30.0,
            },
        ]),
    );
    assert_eq!(
        render_tool(&tool),
        "*Drill* ❌ In Use\n• 1 hour → 10\n• 4 hours → 30\n• 24 hours → 60"
    );
}

#[test]
fn unpriced_tool_renders_placeholder() {
    let tool = Tool::new("Saw", ToolStatus::Available, Pricing::Unpriced);
    assert!(render_tool(&tool).ends_with(NO_RATE_INFO));
}

#[test]
fn catalog_joins_tools_and_adds_hints() {
    let tools = vec![
        Tool::new("Drill", ToolStatus::Available, Pricing::Unpriced),
        Tool::new("Saw", ToolStatus::InUse, Pricing::Unpriced),
    ];
    let rendered = render_catalog(&tools);
    assert!(rendered.starts_with("🛠 *Tools for rent*"));
    let drill = rendered.find("*Drill*").expect("drill listed");
    let saw = rendered.find("*Saw*").expect("saw listed");
    assert!(drill < saw);
    assert!(rendered.contains("/rent_tool"));
}

#[test]
fn empty_catalog_is_not_empty_text() {
    assert!(!render_catalog(&[]).is_empty());
}
