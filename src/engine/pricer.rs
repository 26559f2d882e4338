use crate::domain::{leader, Amount, Bid, Listing, TimeMs, UserId};
use crate::error::BidError;

use super::{Placement, PlacementKind, Quote};

/// Validates bid submissions and computes visible prices under proxy rules.
///
/// A bidder submits only a private ceiling; the engine advances the visible
/// price just far enough to beat the competition, never past anyone's
/// ceiling. Holds no I/O and no clock; callers pass auction state and `now`.
#[derive(Debug, Clone)]
pub struct ProxyPricer {
    increment: Amount,
}

impl ProxyPricer {
    /// Create a pricer with the configured bid increment.
    pub fn new(increment: Amount) -> Self {
        ProxyPricer { increment }
    }

    /// The increment in force.
    pub fn increment(&self) -> Amount {
        self.increment
    }

    /// Pricing summary for an auction in its current state.
    pub fn quote(&self, listing: &Listing, active_bids: &[Bid]) -> Quote {
        let current_visible_bid = active_bids
            .iter()
            .map(|bid| bid.amount)
            .max()
            .unwrap_or(listing.price);
        let minimum_acceptable = if active_bids.is_empty() {
            listing.price
        } else {
            current_visible_bid + self.increment
        };

        Quote {
            current_visible_bid,
            minimum_acceptable,
            leading_bidder: leader(active_bids).map(|bid| bid.bidder_id),
        }
    }

    /// Validate one submission against the live auction state and compute
    /// the resulting placement.
    ///
    /// Preconditions are checked in a fixed order so a submission failing
    /// several of them always reports the same refusal. Validation never
    /// mutates anything; the returned `Placement` is the complete write set.
    pub fn evaluate(
        &self,
        listing: &Listing,
        active_bids: &[Bid],
        bidder_id: UserId,
        maximum_bid: Amount,
        now: TimeMs,
    ) -> Result<Placement, BidError> {
        if !listing.is_biddable(now) {
            return Err(BidError::ListingNotBiddable);
        }
        if bidder_id == listing.seller_id {
            return Err(BidError::SelfBidForbidden);
        }

        let quote = self.quote(listing, active_bids);
        if maximum_bid < quote.minimum_acceptable {
            return Err(BidError::BidTooLow {
                minimum: quote.minimum_acceptable,
            });
        }
        if let Some(own) = active_bids.iter().find(|bid| bid.bidder_id == bidder_id) {
            if maximum_bid <= own.maximum_bid {
                return Err(BidError::MustIncreasePreviousMaximum {
                    current_maximum: own.maximum_bid,
                });
            }
        }

        let placement = match leader(active_bids) {
            // First bid: the visible price opens at the listing price, no
            // matter how high the ceiling.
            None => Placement {
                kind: PlacementKind::OpeningBid,
                visible_bid: quote.minimum_acceptable,
                bidder_row_amount: quote.minimum_acceptable,
                is_now_highest_bidder: true,
                leader_id: bidder_id,
                leader_row_raise: None,
                outbid: None,
            },
            // Leader raising their own ceiling: nothing visible moves.
            Some(incumbent) if incumbent.bidder_id == bidder_id => Placement {
                kind: PlacementKind::CeilingRaise,
                visible_bid: quote.current_visible_bid,
                bidder_row_amount: quote.current_visible_bid,
                is_now_highest_bidder: true,
                leader_id: bidder_id,
                leader_row_raise: None,
                outbid: None,
            },
            // Challenger's ceiling wins: price chases the beaten ceiling by
            // one increment, capped at the challenger's own ceiling.
            Some(incumbent) if maximum_bid > incumbent.maximum_bid => {
                let visible_bid = (incumbent.maximum_bid + self.increment).min(maximum_bid);
                Placement {
                    kind: PlacementKind::LeadTaken,
                    visible_bid,
                    bidder_row_amount: visible_bid,
                    is_now_highest_bidder: true,
                    leader_id: bidder_id,
                    leader_row_raise: None,
                    outbid: Some(incumbent.bidder_id),
                }
            }
            // Incumbent's ceiling absorbs the challenge (ties included; the
            // earlier bid keeps the lead). The price formula is kept exactly
            // as the product defined it.
            Some(incumbent) => {
                let visible_bid =
                    maximum_bid.min(incumbent.maximum_bid - self.increment) + self.increment;
                Placement {
                    kind: PlacementKind::LeadDefended,
                    visible_bid,
                    bidder_row_amount: maximum_bid,
                    is_now_highest_bidder: false,
                    leader_id: incumbent.bidder_id,
                    leader_row_raise: Some((incumbent.id, visible_bid)),
                    outbid: None,
                }
            }
        };

        Ok(placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Listing, ListingStatus};

    const NOW: TimeMs = TimeMs(50_000);

    fn amt(s: &str) -> Amount {
        Amount::from_str_canonical(s).unwrap()
    }

    fn pricer() -> ProxyPricer {
        ProxyPricer::new(amt("5"))
    }

    fn listing_at(price: &str) -> Listing {
        Listing::new(
            UserId::new(),
            "Vintage camera".to_string(),
            amt(price),
            TimeMs::new(100_000),
            TimeMs::new(0),
        )
    }

    /// Mimics the ledger write for an accepted placement so multi-step
    /// scenarios can run against evolving state.
    fn apply(
        placement: &Placement,
        listing: &mut Listing,
        bids: &mut Vec<Bid>,
        bidder_id: UserId,
        maximum_bid: Amount,
        now: TimeMs,
    ) {
        if let Some((bid_id, raised_to)) = placement.leader_row_raise {
            let row = bids.iter_mut().find(|bid| bid.id == bid_id).unwrap();
            row.amount = raised_to;
            row.updated_at = now;
        }
        match bids.iter_mut().find(|bid| bid.bidder_id == bidder_id) {
            Some(own) => {
                own.amount = placement.bidder_row_amount;
                own.maximum_bid = maximum_bid;
                own.updated_at = now;
            }
            None => bids.push(Bid::new(
                listing.id,
                bidder_id,
                placement.bidder_row_amount,
                maximum_bid,
                amt("5"),
                now,
            )),
        }
        listing.current_bid = Some(placement.visible_bid);
        listing.highest_bidder_id = Some(placement.leader_id);
    }

    fn assert_ledger_invariants(listing: &Listing, bids: &[Bid]) {
        let top = crate::domain::leader(bids).expect("invariants need at least one bid");
        assert_eq!(
            listing.current_bid,
            Some(top.amount),
            "visible price must equal the leading row's amount"
        );
        assert_eq!(listing.highest_bidder_id, Some(top.bidder_id));
        for bid in bids {
            assert!(
                bid.amount <= bid.maximum_bid,
                "row amount {} exceeds its own ceiling {}",
                bid.amount,
                bid.maximum_bid
            );
        }
        let mut bidders: Vec<_> = bids.iter().map(|bid| bid.bidder_id).collect();
        bidders.sort();
        bidders.dedup();
        assert_eq!(bidders.len(), bids.len(), "one active row per bidder");
    }

    #[test]
    fn test_opening_bid_lands_on_listing_price() {
        let listing = listing_at("100");
        let placement = pricer()
            .evaluate(&listing, &[], UserId::new(), amt("500"), NOW)
            .unwrap();

        assert_eq!(placement.kind, PlacementKind::OpeningBid);
        assert_eq!(placement.visible_bid, amt("100"));
        assert_eq!(placement.bidder_row_amount, amt("100"));
        assert!(placement.is_now_highest_bidder);
        assert_eq!(placement.outbid, None);
    }

    #[test]
    fn test_first_bid_below_price_rejected() {
        let listing = listing_at("100");
        let err = pricer()
            .evaluate(&listing, &[], UserId::new(), amt("99.99"), NOW)
            .unwrap_err();

        assert_eq!(err, BidError::BidTooLow { minimum: amt("100") });
    }

    #[test]
    fn test_rebid_must_clear_visible_plus_increment() {
        let mut listing = listing_at("100");
        let mut bids = Vec::new();
        let first = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, first, amt("100"), NOW)
            .unwrap();
        apply(&placement, &mut listing, &mut bids, first, amt("100"), NOW);

        let err = pricer()
            .evaluate(&listing, &bids, UserId::new(), amt("104"), NOW)
            .unwrap_err();
        assert_eq!(err, BidError::BidTooLow { minimum: amt("105") });
    }

    #[test]
    fn test_lead_taken_price_capped_by_challenger_ceiling() {
        let mut listing = listing_at("100");
        let mut bids = Vec::new();
        let first = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, first, amt("120"), NOW)
            .unwrap();
        apply(&placement, &mut listing, &mut bids, first, amt("120"), NOW);

        // Beaten ceiling 120 plus increment would be 125; the challenger's
        // own ceiling 123 caps it.
        let challenger = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, challenger, amt("123"), NOW)
            .unwrap();

        assert_eq!(placement.kind, PlacementKind::LeadTaken);
        assert_eq!(placement.visible_bid, amt("123"));
        assert_eq!(placement.outbid, Some(first));
        assert!(placement.is_now_highest_bidder);
    }

    #[test]
    fn test_lead_defended_raises_incumbent_row() {
        let mut listing = listing_at("100");
        let mut bids = Vec::new();
        let incumbent = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, incumbent, amt("150"), NOW)
            .unwrap();
        apply(
            &placement,
            &mut listing,
            &mut bids,
            incumbent,
            amt("150"),
            NOW,
        );

        let challenger = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, challenger, amt("130"), NOW)
            .unwrap();

        assert_eq!(placement.kind, PlacementKind::LeadDefended);
        assert_eq!(placement.visible_bid, amt("135"));
        assert_eq!(placement.bidder_row_amount, amt("130"));
        assert!(!placement.is_now_highest_bidder);
        assert_eq!(placement.leader_id, incumbent);
        let (raised_id, raised_to) = placement.leader_row_raise.unwrap();
        assert_eq!(raised_id, bids[0].id);
        assert_eq!(raised_to, amt("135"));
        assert_eq!(placement.outbid, None);
    }

    #[test]
    fn test_tie_goes_to_earlier_bid() {
        let mut listing = listing_at("100");
        let mut bids = Vec::new();
        let earlier = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, earlier, amt("150"), TimeMs::new(1_000))
            .unwrap();
        apply(
            &placement,
            &mut listing,
            &mut bids,
            earlier,
            amt("150"),
            TimeMs::new(1_000),
        );

        let later = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, later, amt("150"), TimeMs::new(2_000))
            .unwrap();

        assert_eq!(placement.kind, PlacementKind::LeadDefended);
        assert_eq!(placement.leader_id, earlier);
        // min(150, 150 - 5) + 5: the price runs all the way to the tie point.
        assert_eq!(placement.visible_bid, amt("150"));
        assert_eq!(placement.bidder_row_amount, amt("150"));
        assert!(!placement.is_now_highest_bidder);
    }

    #[test]
    fn test_ceiling_raise_leaves_price_alone() {
        let mut listing = listing_at("100");
        let mut bids = Vec::new();
        let bidder = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, bidder, amt("120"), NOW)
            .unwrap();
        apply(&placement, &mut listing, &mut bids, bidder, amt("120"), NOW);

        let placement = pricer()
            .evaluate(&listing, &bids, bidder, amt("200"), NOW)
            .unwrap();

        assert_eq!(placement.kind, PlacementKind::CeilingRaise);
        assert_eq!(placement.visible_bid, amt("100"));
        assert!(placement.is_now_highest_bidder);
        assert_eq!(placement.leader_row_raise, None);
        assert_eq!(placement.outbid, None);
    }

    #[test]
    fn test_ceiling_raise_must_strictly_increase() {
        let mut listing = listing_at("100");
        let mut bids = Vec::new();
        let bidder = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, bidder, amt("120"), NOW)
            .unwrap();
        apply(&placement, &mut listing, &mut bids, bidder, amt("120"), NOW);

        let err = pricer()
            .evaluate(&listing, &bids, bidder, amt("120"), NOW)
            .unwrap_err();
        assert_eq!(
            err,
            BidError::MustIncreasePreviousMaximum {
                current_maximum: amt("120")
            }
        );
    }

    #[test]
    fn test_too_low_reported_before_must_increase() {
        let mut listing = listing_at("100");
        let mut bids = Vec::new();
        let bidder = UserId::new();
        let rival = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, bidder, amt("150"), NOW)
            .unwrap();
        apply(&placement, &mut listing, &mut bids, bidder, amt("150"), NOW);
        let placement = pricer()
            .evaluate(&listing, &bids, rival, amt("130"), NOW)
            .unwrap();
        apply(&placement, &mut listing, &mut bids, rival, amt("130"), NOW);

        // Visible is 135, so the floor is 140. The rival's 120 is both below
        // the floor and below their own previous 130; the floor wins.
        let err = pricer()
            .evaluate(&listing, &bids, rival, amt("120"), NOW)
            .unwrap_err();
        assert_eq!(err, BidError::BidTooLow { minimum: amt("140") });
    }

    #[test]
    fn test_self_bid_rejected() {
        let listing = listing_at("100");
        let err = pricer()
            .evaluate(&listing, &[], listing.seller_id, amt("500"), NOW)
            .unwrap_err();
        assert_eq!(err, BidError::SelfBidForbidden);
    }

    #[test]
    fn test_sold_listing_not_biddable() {
        let mut listing = listing_at("100");
        listing.status = ListingStatus::Sold;
        let err = pricer()
            .evaluate(&listing, &[], UserId::new(), amt("500"), NOW)
            .unwrap_err();
        assert_eq!(err, BidError::ListingNotBiddable);
    }

    #[test]
    fn test_expired_listing_not_biddable_before_sweep() {
        // Still marked active, but past its deadline.
        let listing = listing_at("100");
        let err = pricer()
            .evaluate(
                &listing,
                &[],
                UserId::new(),
                amt("500"),
                TimeMs::new(100_000),
            )
            .unwrap_err();
        assert_eq!(err, BidError::ListingNotBiddable);
    }

    #[test]
    fn test_quote_before_and_after_first_bid() {
        let mut listing = listing_at("100");
        let mut bids = Vec::new();

        let quote = pricer().quote(&listing, &bids);
        assert_eq!(quote.current_visible_bid, amt("100"));
        assert_eq!(quote.minimum_acceptable, amt("100"));
        assert_eq!(quote.leading_bidder, None);

        let bidder = UserId::new();
        let placement = pricer()
            .evaluate(&listing, &bids, bidder, amt("100"), NOW)
            .unwrap();
        apply(&placement, &mut listing, &mut bids, bidder, amt("100"), NOW);

        let quote = pricer().quote(&listing, &bids);
        assert_eq!(quote.current_visible_bid, amt("100"));
        assert_eq!(quote.minimum_acceptable, amt("105"));
        assert_eq!(quote.leading_bidder, Some(bidder));
    }

    /// The documented walk: price 100, increment 5, bidders A and B.
    #[test]
    fn test_two_bidder_walk() {
        let mut listing = listing_at("100");
        let mut bids = Vec::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let pricer = pricer();

        // A opens at her ceiling of 100: visible 100.
        let placement = pricer
            .evaluate(&listing, &bids, alice, amt("100"), TimeMs::new(1_000))
            .unwrap();
        assert_eq!(placement.visible_bid, amt("100"));
        apply(
            &placement,
            &mut listing,
            &mut bids,
            alice,
            amt("100"),
            TimeMs::new(1_000),
        );
        assert_ledger_invariants(&listing, &bids);

        // B's 150 beats 100: visible 105, A displaced.
        let placement = pricer
            .evaluate(&listing, &bids, bob, amt("150"), TimeMs::new(2_000))
            .unwrap();
        assert_eq!(placement.visible_bid, amt("105"));
        assert_eq!(placement.outbid, Some(alice));
        apply(
            &placement,
            &mut listing,
            &mut bids,
            bob,
            amt("150"),
            TimeMs::new(2_000),
        );
        assert_ledger_invariants(&listing, &bids);

        // A's 130 falls short of B's 150: B defends, visible 135.
        let placement = pricer
            .evaluate(&listing, &bids, alice, amt("130"), TimeMs::new(3_000))
            .unwrap();
        assert_eq!(placement.visible_bid, amt("135"));
        assert!(!placement.is_now_highest_bidder);
        assert_eq!(placement.leader_id, bob);
        apply(
            &placement,
            &mut listing,
            &mut bids,
            alice,
            amt("130"),
            TimeMs::new(3_000),
        );
        assert_ledger_invariants(&listing, &bids);
        assert_eq!(listing.current_bid, Some(amt("135")));
        let bob_row = bids.iter().find(|bid| bid.bidder_id == bob).unwrap();
        assert_eq!(bob_row.amount, amt("135"));

        // B already holds 150; 140 is not an increase.
        let err = pricer
            .evaluate(&listing, &bids, bob, amt("140"), TimeMs::new(4_000))
            .unwrap_err();
        assert_eq!(
            err,
            BidError::MustIncreasePreviousMaximum {
                current_maximum: amt("150")
            }
        );

        // The seller cannot join in.
        let err = pricer
            .evaluate(
                &listing,
                &bids,
                listing.seller_id,
                amt("500"),
                TimeMs::new(5_000),
            )
            .unwrap_err();
        assert_eq!(err, BidError::SelfBidForbidden);

        // Nothing above changed the ledger: B still leads at 135 with
        // ceiling 150, which is what settlement would sell at.
        let top = crate::domain::leader(&bids).unwrap();
        assert_eq!(top.bidder_id, bob);
        assert_eq!(top.amount, amt("135"));
    }
}
