//! Price identifier to plan tier resolution.
//!
//! Price mappings are loaded once at startup and injected into the resolver;
//! nothing here reads the environment.

use std::collections::{HashMap, HashSet};

use super::plan_tier::PlanTier;

/// Immutable mapping of provider price ids to plan tiers.
///
/// A price id may appear under several tiers (misconfiguration). Resolution
/// then picks the highest-ranked tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceMappings {
    tiers: HashMap<PlanTier, HashSet<String>>,
    seat_price_id: Option<String>,
}

impl PriceMappings {
    /// Creates an empty mapping. Every lookup resolves to FREE.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers price ids for a tier. Blank entries are ignored.
    pub fn with_prices<I, S>(mut self, tier: PlanTier, price_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.tiers.entry(tier).or_default();
        for id in price_ids {
            let id = id.as_ref().trim();
            if !id.is_empty() {
                entry.insert(id.to_string());
            }
        }
        self
    }

    /// Sets the per-seat price id used to derive seat counts.
    pub fn with_seat_price(mut self, price_id: impl Into<String>) -> Self {
        let price_id = price_id.into();
        let trimmed = price_id.trim();
        self.seat_price_id = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Returns true if the price id is configured for the given tier.
    pub fn contains(&self, tier: PlanTier, price_id: &str) -> bool {
        self.tiers
            .get(&tier)
            .map(|ids| ids.contains(price_id))
            .unwrap_or(false)
    }

    /// The configured per-seat price id, if any.
    pub fn seat_price_id(&self) -> Option<&str> {
        self.seat_price_id.as_deref()
    }
}

/// Maps provider price ids to plan tiers.
///
/// Pure: no I/O and no failure mode. An absent or unknown price id
/// resolves to [`PlanTier::Free`].
#[derive(Debug, Clone, Default)]
pub struct PlanResolver {
    mappings: PriceMappings,
}

impl PlanResolver {
    pub fn new(mappings: PriceMappings) -> Self {
        Self { mappings }
    }

    /// Resolves a single price id.
    ///
    /// Tiers are checked from highest rank down, so a price id configured
    /// under multiple tiers resolves to the highest of them.
    pub fn resolve(&self, price_id: Option<&str>) -> PlanTier {
        let Some(price_id) = price_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return PlanTier::Free;
        };

        PlanTier::ALL
            .iter()
            .rev()
            .copied()
            .find(|tier| self.mappings.contains(*tier, price_id))
            .unwrap_or(PlanTier::Free)
    }

    /// Resolves a set of subscription item prices to the highest tier any of
    /// them maps to.
    pub fn resolve_items<'a, I>(&self, price_ids: I) -> PlanTier
    where
        I: IntoIterator<Item = &'a str>,
    {
        price_ids
            .into_iter()
            .map(|id| self.resolve(Some(id)))
            .max_by_key(PlanTier::rank)
            .unwrap_or(PlanTier::Free)
    }

    pub fn mappings(&self) -> &PriceMappings {
        &self.mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolver() -> PlanResolver {
        PlanResolver::new(
            PriceMappings::new()
                .with_prices(PlanTier::Pro, ["price_pro_monthly", "price_pro_yearly"])
                .with_prices(PlanTier::Enterprise, ["price_ent"])
                .with_seat_price("price_seat"),
        )
    }

    #[test]
    fn resolves_configured_price() {
        let r = resolver();
        assert_eq!(r.resolve(Some("price_pro_monthly")), PlanTier::Pro);
        assert_eq!(r.resolve(Some("price_pro_yearly")), PlanTier::Pro);
        assert_eq!(r.resolve(Some("price_ent")), PlanTier::Enterprise);
    }

    #[test]
    fn absent_price_is_free() {
        assert_eq!(resolver().resolve(None), PlanTier::Free);
        assert_eq!(resolver().resolve(Some("")), PlanTier::Free);
    }

    #[test]
    fn unknown_price_is_free() {
        assert_eq!(resolver().resolve(Some("price_other")), PlanTier::Free);
    }

    #[test]
    fn price_listed_under_two_tiers_resolves_to_highest() {
        let r = PlanResolver::new(
            PriceMappings::new()
                .with_prices(PlanTier::Pro, ["price_dup"])
                .with_prices(PlanTier::Enterprise, ["price_dup"]),
        );
        assert_eq!(r.resolve(Some("price_dup")), PlanTier::Enterprise);
    }

    #[test]
    fn blank_configured_entries_are_ignored() {
        let r = PlanResolver::new(PriceMappings::new().with_prices(PlanTier::Pro, ["", "  "]));
        assert_eq!(r.resolve(Some(" ")), PlanTier::Free);
    }

    #[test]
    fn resolve_items_picks_highest_tier() {
        let r = resolver();
        let tier = r.resolve_items(["price_seat", "price_pro_monthly", "price_ent"]);
        assert_eq!(tier, PlanTier::Enterprise);
    }

    #[test]
    fn resolve_items_without_items_is_free() {
        assert_eq!(resolver().resolve_items(std::iter::empty()), PlanTier::Free);
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic(price in "[a-z_]{0,20}") {
            let r = resolver();
            prop_assert_eq!(r.resolve(Some(&price)), r.resolve(Some(&price)));
        }

        #[test]
        fn unmapped_prices_always_resolve_to_free(price in "unmapped_[a-z0-9]{1,16}") {
            prop_assert_eq!(resolver().resolve(Some(&price)), PlanTier::Free);
        }

        #[test]
        fn highest_configured_tier_wins(
            in_free in any::<bool>(),
            in_pro in any::<bool>(),
            in_ent in any::<bool>(),
        ) {
            let mut mappings = PriceMappings::new();
            let mut expected = PlanTier::Free;
            if in_free {
                mappings = mappings.with_prices(PlanTier::Free, ["price_x"]);
            }
            if in_pro {
                mappings = mappings.with_prices(PlanTier::Pro, ["price_x"]);
                expected = PlanTier::Pro;
            }
            if in_ent {
                mappings = mappings.with_prices(PlanTier::Enterprise, ["price_x"]);
                expected = PlanTier::Enterprise;
            }
            prop_assert_eq!(PlanResolver::new(mappings).resolve(Some("price_x")), expected);
        }
    }
}
