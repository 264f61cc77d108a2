use album_bot::aggregator::{RatingAggregator, RatingScale, RatingSummary};
use album_bot::types::{PostId, ReactionChange, ReactionEvent, Result, UserId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

fn reaction(post: &str, user: &str, emoji: &str, change: ReactionChange) -> ReactionEvent {
    ReactionEvent {
        post_id: PostId(post.to_string()),
        user_id: UserId(user.to_string()),
        emoji: emoji.to_string(),
        change,
        is_bot: false,
    }
}

fn symbol(scale: &RatingScale, rating: u8) -> String {
    scale.symbols()[rating as usize - 1].clone()
}

fn tracking(size: usize, post: &str) -> Result<RatingAggregator> {
    let mut aggregator = RatingAggregator::new(RatingScale::keycaps(size)?);
    aggregator.register_post(PostId(post.to_string()), "Radiohead - OK Computer");
    Ok(aggregator)
}

#[test]
fn test_average_follows_adds_and_removes() -> Result<()> {
    let mut aggregator = tracking(5, "p1")?;
    let scale = aggregator.scale().clone();

    let update = aggregator
        .apply_reaction(&reaction("p1", "u1", &symbol(&scale, 3), ReactionChange::Added))
        .expect("rating on the active post");
    assert_eq!(update.footer, "Average rating: 3.0 \u{2b50} from 1 votes.");

    let update = aggregator
        .apply_reaction(&reaction("p1", "u2", &symbol(&scale, 5), ReactionChange::Added))
        .expect("rating on the active post");
    assert_eq!(update.footer, "Average rating: 4.0 \u{2b50} from 2 votes.");

    let update = aggregator
        .apply_reaction(&reaction("p1", "u1", &symbol(&scale, 3), ReactionChange::Removed))
        .expect("rating on the active post");
    assert_eq!(update.footer, "Average rating: 5.0 \u{2b50} from 1 votes.");
    assert_eq!(update.post_id, PostId("p1".to_string()));

    Ok(())
}

#[test]
fn test_empty_tally_shows_sentinel() -> Result<()> {
    let mut aggregator = tracking(5, "p1")?;
    let scale = aggregator.scale().clone();

    aggregator.apply_reaction(&reaction("p1", "u1", &symbol(&scale, 2), ReactionChange::Added));
    let update = aggregator
        .apply_reaction(&reaction("p1", "u1", &symbol(&scale, 2), ReactionChange::Removed))
        .expect("rating on the active post");

    assert_eq!(update.summary, RatingSummary::NoRatings);
    assert_eq!(update.footer, "No ratings yet. React with 1\u{fe0f}\u{20e3} to 5\u{fe0f}\u{20e3} to rate!");
    Ok(())
}

#[test]
fn test_switching_symbol_replaces_rating() -> Result<()> {
    let mut aggregator = tracking(5, "p1")?;
    let scale = aggregator.scale().clone();
    let user = UserId("u1".to_string());

    aggregator.apply_reaction(&reaction("p1", "u1", &symbol(&scale, 1), ReactionChange::Added));
    let update = aggregator
        .apply_reaction(&reaction("p1", "u1", &symbol(&scale, 4), ReactionChange::Added))
        .expect("rating on the active post");

    assert_eq!(aggregator.rating_of(&user), Some(4));
    assert_eq!(update.summary, RatingSummary::Average { average: 4.0, votes: 1 });
    Ok(())
}

#[test]
fn test_stale_removal_keeps_current_rating() -> Result<()> {
    let mut aggregator = tracking(5, "p1")?;
    let scale = aggregator.scale().clone();
    let user = UserId("u1".to_string());

    // User moves from 2 to 5, and the removal of 2 arrives afterwards.
    aggregator.apply_reaction(&reaction("p1", "u1", &symbol(&scale, 2), ReactionChange::Added));
    aggregator.apply_reaction(&reaction("p1", "u1", &symbol(&scale, 5), ReactionChange::Added));
    let update = aggregator
        .apply_reaction(&reaction("p1", "u1", &symbol(&scale, 2), ReactionChange::Removed))
        .expect("rating on the active post");

    assert_eq!(aggregator.rating_of(&user), Some(5));
    assert_eq!(update.summary, RatingSummary::Average { average: 5.0, votes: 1 });
    Ok(())
}

#[test]
fn test_ignores_irrelevant_events() -> Result<()> {
    let mut aggregator = tracking(5, "p1")?;
    let scale = aggregator.scale().clone();

    // Different post.
    assert!(aggregator
        .apply_reaction(&reaction("p0", "u1", &symbol(&scale, 3), ReactionChange::Added))
        .is_none());
    // Not a rating symbol.
    assert!(aggregator
        .apply_reaction(&reaction("p1", "u1", "\u{1f525}", ReactionChange::Added))
        .is_none());
    // Outside a 5-point scale.
    assert!(aggregator
        .apply_reaction(&reaction("p1", "u1", "7\u{fe0f}\u{20e3}", ReactionChange::Added))
        .is_none());
    // The bot's own reactions.
    let mut own = reaction("p1", "bot", &symbol(&scale, 1), ReactionChange::Added);
    own.is_bot = true;
    assert!(aggregator.apply_reaction(&own).is_none());

    assert_eq!(aggregator.summary(), RatingSummary::NoRatings);
    Ok(())
}

#[test]
fn test_idle_aggregator_ignores_everything() -> Result<()> {
    let scale = RatingScale::keycaps(5)?;
    let mut aggregator = RatingAggregator::new(scale.clone());

    assert!(aggregator.active_post().is_none());
    assert!(aggregator
        .apply_reaction(&reaction("p1", "u1", &symbol(&scale, 3), ReactionChange::Added))
        .is_none());
    Ok(())
}

#[test]
fn test_new_post_retires_previous_tally() -> Result<()> {
    let mut aggregator = tracking(5, "p1")?;
    let scale = aggregator.scale().clone();

    aggregator.apply_reaction(&reaction("p1", "u1", &symbol(&scale, 4), ReactionChange::Added));
    aggregator.register_post(PostId("p2".to_string()), "Björk - Homogenic");

    assert_eq!(aggregator.active_post(), Some(&PostId("p2".to_string())));
    assert_eq!(aggregator.summary(), RatingSummary::NoRatings);
    assert!(aggregator
        .apply_reaction(&reaction("p1", "u2", &symbol(&scale, 1), ReactionChange::Added))
        .is_none());
    assert_eq!(aggregator.summary(), RatingSummary::NoRatings);
    Ok(())
}

#[test]
fn test_ten_point_scale_and_rounding() -> Result<()> {
    let mut aggregator = tracking(10, "p1")?;

    aggregator.apply_reaction(&reaction("p1", "u1", "\u{1f51f}", ReactionChange::Added));
    aggregator.apply_reaction(&reaction("p1", "u2", "4\u{fe0f}\u{20e3}", ReactionChange::Added));
    // Same keycap without the variation selector.
    let update = aggregator
        .apply_reaction(&reaction("p1", "u3", "4\u{20e3}", ReactionChange::Added))
        .expect("rating on the active post");

    assert_eq!(update.summary, RatingSummary::Average { average: 6.0, votes: 3 });

    let update = aggregator
        .apply_reaction(&reaction("p1", "u3", "5\u{20e3}", ReactionChange::Added))
        .expect("rating on the active post");
    // (10 + 4 + 5) / 3 = 6.333...
    assert_eq!(update.footer, "Average rating: 6.33 \u{2b50} from 3 votes.");
    Ok(())
}

fn footer_for(votes: &[u8]) -> Result<String> {
    let mut aggregator = tracking(5, "p1")?;
    let scale = aggregator.scale().clone();
    let mut footer = String::new();
    for (i, rating) in votes.iter().enumerate() {
        let update = aggregator
            .apply_reaction(&reaction("p1", &format!("u{}", i), &symbol(&scale, *rating), ReactionChange::Added))
            .expect("rating on the active post");
        footer = update.footer;
    }
    Ok(footer)
}

#[test]
fn test_average_halves_round_to_even() -> Result<()> {
    // 9 / 8 = 1.125
    assert_eq!(footer_for(&[1, 1, 1, 1, 1, 1, 1, 2])?, "Average rating: 1.12 \u{2b50} from 8 votes.");
    // 13 / 8 = 1.625
    assert_eq!(footer_for(&[1, 1, 1, 2, 2, 2, 2, 2])?, "Average rating: 1.62 \u{2b50} from 8 votes.");
    // 11 / 8 = 1.375
    assert_eq!(footer_for(&[1, 1, 1, 1, 1, 2, 2, 2])?, "Average rating: 1.38 \u{2b50} from 8 votes.");
    // 21 / 8 = 2.625
    assert_eq!(footer_for(&[2, 2, 2, 3, 3, 3, 3, 3])?, "Average rating: 2.62 \u{2b50} from 8 votes.");
    assert_eq!(footer_for(&[1, 1, 2])?, "Average rating: 1.33 \u{2b50} from 3 votes.");
    assert_eq!(footer_for(&[1, 2, 2])?, "Average rating: 1.67 \u{2b50} from 3 votes.");
    assert_eq!(footer_for(&[4, 5])?, "Average rating: 4.5 \u{2b50} from 2 votes.");
    Ok(())
}

#[test]
fn test_scale_validation() {
    assert!(RatingScale::keycaps(0).is_err());
    assert!(RatingScale::keycaps(11).is_err());
    assert!(RatingScale::from_symbols(vec![]).is_err());
    assert!(RatingScale::from_symbols(vec!["1\u{fe0f}\u{20e3}".into(), "1\u{20e3}".into()]).is_err());

    let custom = RatingScale::from_symbols(vec!["\u{1f44e}".into(), "\u{1f44d}".into()]).unwrap();
    assert_eq!(custom.max_rating(), 2);
    assert_eq!(custom.rating_for("\u{1f44d}"), Some(2));
}

#[test]
fn test_random_event_sequences_match_model() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);

    for size in [5usize, 10] {
        let mut aggregator = tracking(size, "p1")?;
        let scale = aggregator.scale().clone();
        let mut model: HashMap<String, u8> = HashMap::new();

        for _ in 0..500 {
            let user = format!("u{}", rng.gen_range(0..6));
            let rating = rng.gen_range(1..=size as u8);
            let change = if rng.gen_bool(0.6) {
                ReactionChange::Added
            } else {
                ReactionChange::Removed
            };

            match change {
                ReactionChange::Added => {
                    model.insert(user.clone(), rating);
                }
                ReactionChange::Removed => {
                    if model.get(&user) == Some(&rating) {
                        model.remove(&user);
                    }
                }
            }

            let update = aggregator
                .apply_reaction(&reaction("p1", &user, &symbol(&scale, rating), change))
                .expect("rating on the active post");

            if model.is_empty() {
                assert_eq!(update.summary, RatingSummary::NoRatings);
            } else {
                let sum: u32 = model.values().map(|r| *r as u32).sum();
                let mean = sum as f64 / model.len() as f64;
                let RatingSummary::Average { average, votes } = update.summary else {
                    panic!("expected an average for {} votes", model.len());
                };
                assert_eq!(votes, model.len());
                // Two decimals, and never further than half a cent from the mean.
                assert!(((average * 100.0) - (average * 100.0).round()).abs() < 1e-6);
                assert!((average - mean).abs() <= 0.005 + 1e-9, "{} vs {}", average, mean);
            }

            // Events for another post never change anything.
            let before = aggregator.summary();
            assert!(aggregator
                .apply_reaction(&reaction("other", &user, &symbol(&scale, rating), ReactionChange::Added))
                .is_none());
            assert_eq!(aggregator.summary(), before);
        }
    }
    Ok(())
}
