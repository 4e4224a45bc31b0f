//! Forward session planning: distributes due and overdue cards across a
//! calendar window without exceeding a per-day minute budget.
//!
//! Pure computation over already-fetched cards; the planner consumes
//! `next_review_at` but never writes it. Cost is O(days x cards), so
//! callers with huge windows should keep them reasonable.

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{Datelike, NaiveDate, Weekday};
use log::debug;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{Card, DailySchedule, ScheduleEntry};

/// Default minutes one card is assumed to take.
pub const DEFAULT_MINUTES_PER_CARD: u32 = 2;

/// Planning window and capacity constraints.
#[derive(Debug, Clone)]
pub struct ScheduleWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_budget_minutes: u32,
    pub available_weekdays: HashSet<Weekday>,
    pub minutes_per_card: u32,
}

impl ScheduleWindow {
    /// A window with every weekday available and the default per-card cost.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, daily_budget_minutes: u32) -> Self {
        use Weekday::*;
        Self {
            start_date,
            end_date,
            daily_budget_minutes,
            available_weekdays: HashSet::from([Mon, Tue, Wed, Thu, Fri, Sat, Sun]),
            minutes_per_card: DEFAULT_MINUTES_PER_CARD,
        }
    }
}

/// Plans a calendar of study days over `[start_date, end_date]`.
///
/// Each available day first takes every card whose `next_review_at`
/// falls on that day. Due cards are never dropped: a day whose due set
/// alone blows the budget is scheduled in full and flagged over-budget.
/// Remaining capacity is backfilled with the oldest still-unscheduled
/// overdue cards, so a deep backlog drains oldest-first instead of
/// starving any one card. Leftover backlog rolls forward to the next
/// eligible day.
///
/// An inverted date range or an empty weekday set yields an empty plan.
pub fn plan_schedule(
    cards: &[Card],
    window: &ScheduleWindow,
) -> Result<Vec<DailySchedule>, EngineError> {
    if window.daily_budget_minutes == 0 {
        return Err(EngineError::InvalidConfiguration(
            "daily budget must be at least one minute".into(),
        ));
    }
    if window.minutes_per_card == 0 {
        return Err(EngineError::InvalidConfiguration(
            "per-card minutes must be non-zero".into(),
        ));
    }
    if window.start_date > window.end_date || window.available_weekdays.is_empty() {
        return Ok(Vec::new());
    }

    // A budget smaller than one card's cost means zero capacity: due
    // cards still land on their day (and flag it over-budget), but the
    // backlog stays put.
    let capacity = (window.daily_budget_minutes / window.minutes_per_card) as usize;

    // Cards already overdue when the window opens form the initial
    // backlog, oldest first.
    let mut backlog: Vec<(NaiveDate, Uuid)> = cards
        .iter()
        .filter(|c| c.next_review_at.date_naive() < window.start_date)
        .map(|c| (c.next_review_at.date_naive(), c.id))
        .collect();
    backlog.sort();
    let mut backlog: VecDeque<(NaiveDate, Uuid)> = backlog.into();

    // Cards that become due inside the window, grouped by day.
    let mut due_by_day: BTreeMap<NaiveDate, Vec<Uuid>> = BTreeMap::new();
    for card in cards {
        let due_date = card.next_review_at.date_naive();
        if due_date >= window.start_date && due_date <= window.end_date {
            due_by_day.entry(due_date).or_default().push(card.id);
        }
    }

    let mut plan = Vec::new();
    let mut day = window.start_date;
    loop {
        if !window.available_weekdays.contains(&day.weekday()) {
            // Cards due on an unavailable day become backlog for the next
            // eligible one.
            if let Some(ids) = due_by_day.remove(&day) {
                for id in ids {
                    backlog.push_back((day, id));
                }
            }
        } else {
            let mut entries: Vec<ScheduleEntry> = Vec::new();

            for card_id in due_by_day.remove(&day).unwrap_or_default() {
                entries.push(ScheduleEntry {
                    card_id,
                    allocated_minutes: window.minutes_per_card,
                });
            }
            let over_budget = entries.len() > capacity;

            while entries.len() < capacity {
                let Some((_, card_id)) = backlog.pop_front() else {
                    break;
                };
                entries.push(ScheduleEntry {
                    card_id,
                    allocated_minutes: window.minutes_per_card,
                });
            }

            if !entries.is_empty() {
                let total_minutes = entries.len() as u32 * window.minutes_per_card;
                plan.push(DailySchedule {
                    date: day,
                    entries,
                    total_minutes,
                    over_budget,
                });
            }
        }

        if day >= window.end_date {
            break;
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }

    debug!(
        "planned {} study days, {} cards left in backlog",
        plan.len(),
        backlog.len()
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn card_due_on(date: NaiveDate) -> Card {
        let mut card = Card::new(Uuid::new_v4(), None);
        card.next_review_at = Utc
            .from_utc_datetime(&date.and_hms_opt(9, 0, 0).unwrap());
        card
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn inverted_range_yields_empty_plan() {
        let window = ScheduleWindow::new(date(2026, 3, 10), date(2026, 3, 1), 30);
        let plan = plan_schedule(&[card_due_on(date(2026, 3, 5))], &window).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn empty_weekday_set_yields_empty_plan() {
        let mut window = ScheduleWindow::new(date(2026, 3, 2), date(2026, 3, 8), 30);
        window.available_weekdays.clear();
        let plan = plan_schedule(&[card_due_on(date(2026, 3, 3))], &window).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn zero_budget_is_a_configuration_error() {
        let window = ScheduleWindow::new(date(2026, 3, 2), date(2026, 3, 8), 0);
        let err = plan_schedule(&[], &window).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn due_cards_land_on_their_own_day() {
        let window = ScheduleWindow::new(date(2026, 3, 2), date(2026, 3, 4), 10);
        let cards = vec![
            card_due_on(date(2026, 3, 2)),
            card_due_on(date(2026, 3, 3)),
            card_due_on(date(2026, 3, 3)),
        ];
        let plan = plan_schedule(&cards, &window).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].date, date(2026, 3, 2));
        assert_eq!(plan[0].entries.len(), 1);
        assert_eq!(plan[1].date, date(2026, 3, 3));
        assert_eq!(plan[1].entries.len(), 2);
        for day in &plan {
            assert!(day.total_minutes <= window.daily_budget_minutes);
            assert!(!day.over_budget);
        }
    }

    #[test]
    fn due_set_exceeding_budget_is_kept_and_flagged() {
        // Budget fits 2 cards; 4 are due the same day.
        let window = ScheduleWindow::new(date(2026, 3, 2), date(2026, 3, 2), 4);
        let cards: Vec<Card> = (0..4).map(|_| card_due_on(date(2026, 3, 2))).collect();
        let plan = plan_schedule(&cards, &window).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].entries.len(), 4);
        assert!(plan[0].over_budget);
        assert!(plan[0].total_minutes > window.daily_budget_minutes);
    }

    #[test]
    fn backlog_drains_oldest_first_across_eligible_days() {
        // 25 overdue cards, capacity 10/day, only Mondays over two weeks.
        let start = date(2026, 3, 2); // a Monday
        let mut window = ScheduleWindow::new(start, date(2026, 3, 15), 20);
        window.available_weekdays = HashSet::from([Weekday::Mon]);

        let mut cards = Vec::new();
        for i in 0..25i64 {
            // Oldest card is 25 days overdue, newest 1 day.
            cards.push(card_due_on(start - Duration::days(25 - i)));
        }
        let oldest_ten: Vec<Uuid> = cards[..10].iter().map(|c| c.id).collect();
        let next_ten: Vec<Uuid> = cards[10..20].iter().map(|c| c.id).collect();

        let plan = plan_schedule(&cards, &window).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].date, date(2026, 3, 2));
        assert_eq!(plan[1].date, date(2026, 3, 9));

        let day1: Vec<Uuid> = plan[0].entries.iter().map(|e| e.card_id).collect();
        let day2: Vec<Uuid> = plan[1].entries.iter().map(|e| e.card_id).collect();
        assert_eq!(day1, oldest_ten);
        assert_eq!(day2, next_ten);

        // Nothing is scheduled twice; the remaining 5 stay in the backlog
        // and appear once a third Monday is in range.
        let mut wider = window.clone();
        wider.end_date = date(2026, 3, 22);
        let wider_plan = plan_schedule(&cards, &wider).unwrap();
        assert_eq!(wider_plan.len(), 3);
        assert_eq!(wider_plan[2].entries.len(), 5);

        let mut seen: Vec<Uuid> = wider_plan
            .iter()
            .flat_map(|d| d.entries.iter().map(|e| e.card_id))
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn budget_below_one_card_never_backfills() {
        // Budget fits no card at all; capacity is zero.
        let mut window = ScheduleWindow::new(date(2026, 3, 2), date(2026, 3, 2), 1);
        window.minutes_per_card = 2;

        // A backlog-only day stays within budget by scheduling nothing.
        let overdue = card_due_on(date(2026, 2, 27));
        let plan = plan_schedule(&[overdue], &window).unwrap();
        assert!(plan.is_empty());

        // Same-day due cards are still never dropped, and the day is
        // flagged rather than pretending to fit the budget.
        let due = card_due_on(date(2026, 3, 2));
        let plan = plan_schedule(&[due], &window).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].entries.len(), 1);
        assert!(plan[0].over_budget);
        assert!(plan[0].total_minutes > window.daily_budget_minutes);
    }

    #[test]
    fn due_on_unavailable_day_rolls_forward() {
        // Due on Saturday, only Monday available.
        let mut window = ScheduleWindow::new(date(2026, 3, 7), date(2026, 3, 9), 10);
        window.available_weekdays = HashSet::from([Weekday::Mon]);
        let card = card_due_on(date(2026, 3, 7)); // Saturday

        let plan = plan_schedule(&[card.clone()], &window).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].date, date(2026, 3, 9));
        assert_eq!(plan[0].entries[0].card_id, card.id);
    }

    #[test]
    fn schedule_serializes_for_callers() {
        let window = ScheduleWindow::new(date(2026, 3, 2), date(2026, 3, 2), 10);
        let plan = plan_schedule(&[card_due_on(date(2026, 3, 2))], &window).unwrap();
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("allocated_minutes"));
    }
}
