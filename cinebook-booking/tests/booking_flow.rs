use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use cinebook_booking::{BookingStack, HoldRequest, VerifyRequest};
use cinebook_core::payment::{GatewayAdapter, IntentStatus};
use cinebook_core::BookingError;
use cinebook_domain::booking::{BookingStatus, SettlementStatus};
use cinebook_domain::repository::{BookingRepository, PaymentRepository, ShowRepository};
use cinebook_domain::show::{Show, TheaterLayout};
use cinebook_gateway::{CinePayGateway, RazorpayGateway, StripeGateway};
use cinebook_store::{BusinessRules, MemoryStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn stack_with(gateway: Arc<dyn GatewayAdapter>) -> BookingStack {
    BookingStack::assemble(
        Arc::new(MemoryStore::new()),
        gateway,
        BusinessRules::default(),
    )
}

async fn seed_show(store: &MemoryStore, price: i32, rows: usize, cols: usize) -> Uuid {
    let show = Show::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        Utc::now() + Duration::hours(3),
        price,
        TheaterLayout { rows, cols },
    )
    .unwrap();
    let id = show.id;
    store.insert_show(show).await.unwrap();
    id
}

fn hold(show_id: Uuid, user_id: Uuid, seats: &[&str], total: i32) -> HoldRequest {
    HoldRequest {
        show_id,
        user_id,
        selected_seats: seats.iter().map(|s| s.to_string()).collect(),
        total_price: total,
    }
}

async fn grid_of(store: &MemoryStore, show_id: Uuid) -> cinebook_domain::SeatGrid {
    store.get_show(show_id).await.unwrap().unwrap().show.seats
}

/// The 2x2 walk-through: hold, conflicting hold, verified payment, and the
/// freed seats becoming bookable again.
#[tokio::test]
async fn online_payment_walkthrough_on_a_2x2_grid() {
    init_tracing();
    let stack = stack_with(Arc::new(CinePayGateway));
    let show_id = seed_show(&stack.store, 100, 2, 2).await;
    let user_x = stack.store.seed_user("x@example.com").await;
    let user_y = stack.store.seed_user("y@example.com").await;

    // X holds A1 + B1.
    let booking = stack
        .orchestrator
        .hold_seats(hold(show_id, user_x, &["A1", "B1"], 200))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);

    // Y collides on A1 only.
    let err = stack
        .orchestrator
        .hold_seats(hold(show_id, user_y, &["A1", "A2"], 200))
        .await
        .unwrap_err();
    match err {
        BookingError::SeatConflict { seats } => assert_eq!(seats, vec!["A1"]),
        other => panic!("expected seat conflict, got {:?}", other),
    }

    // X pays.
    let handle = stack
        .orchestrator
        .initiate_payment(booking.id, user_x)
        .await
        .unwrap();
    let confirmation = stack
        .orchestrator
        .verify_payment(VerifyRequest {
            booking_id: booking.id,
            user_id: user_x,
            gateway_order_id: handle.intent.gateway_order_id.clone(),
            gateway_payment_id: "pay_x_1".into(),
            proof: "any".into(),
        })
        .await
        .unwrap();
    assert!(!confirmation.already_confirmed);
    assert_eq!(confirmation.booking.status, BookingStatus::Booked);
    assert_eq!(
        confirmation.booking.payment_status,
        SettlementStatus::PaidOnline
    );
    assert_eq!(confirmation.intent.status, IntentStatus::Completed);

    let grid = grid_of(&stack.store, show_id).await;
    assert_eq!(grid.booked_count(), 2);
    assert!(grid.is_available("A2".parse().unwrap()));
    assert!(grid.is_available("B2".parse().unwrap()));

    // The confirmed booking landed on X's record.
    let record = stack.store.user(user_x).await.unwrap();
    assert_eq!(record.bookings, vec![booking.id]);

    // Y can now take the remaining seats.
    stack
        .orchestrator
        .hold_seats(hold(show_id, user_y, &["A2", "B2"], 200))
        .await
        .unwrap();
}

/// Two simultaneous holds over overlapping seats: exactly one wins, the loser
/// learns exactly which seats were the problem.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overlapping_holds_admit_one_winner() {
    let stack = stack_with(Arc::new(CinePayGateway));
    let show_id = seed_show(&stack.store, 100, 2, 2).await;
    let user_x = stack.store.seed_user("x@example.com").await;
    let user_y = stack.store.seed_user("y@example.com").await;

    let orch_x = stack.orchestrator.clone();
    let orch_y = stack.orchestrator.clone();
    let x = tokio::spawn(async move {
        orch_x
            .hold_seats(hold(show_id, user_x, &["A1", "B1"], 200))
            .await
    });
    let y = tokio::spawn(async move {
        orch_y
            .hold_seats(hold(show_id, user_y, &["A1", "A2"], 200))
            .await
    });

    let results = vec![x.await.unwrap(), y.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one hold may win: {:?}", results);

    let loser = results.into_iter().find(|r| r.is_err()).unwrap().unwrap_err();
    match loser {
        BookingError::SeatConflict { seats } => assert_eq!(seats, vec!["A1"]),
        other => panic!("loser must see the seat conflict, got {:?}", other),
    }

    // Loser's non-overlapping seat was never locked.
    let grid = grid_of(&stack.store, show_id).await;
    let locked = grid.seat_view().iter().filter(|v| !matches!(v.status, cinebook_domain::SeatState::Available)).count();
    assert_eq!(locked, 2);
}

/// Re-submitting the same verification after success changes nothing.
#[tokio::test]
async fn duplicate_verification_is_a_no_op() {
    let stack = stack_with(Arc::new(CinePayGateway));
    let show_id = seed_show(&stack.store, 100, 2, 2).await;
    let user = stack.store.seed_user("x@example.com").await;

    let booking = stack
        .orchestrator
        .hold_seats(hold(show_id, user, &["A1"], 100))
        .await
        .unwrap();
    let handle = stack
        .orchestrator
        .initiate_payment(booking.id, user)
        .await
        .unwrap();
    let req = VerifyRequest {
        booking_id: booking.id,
        user_id: user,
        gateway_order_id: handle.intent.gateway_order_id.clone(),
        gateway_payment_id: "pay_1".into(),
        proof: "".into(),
    };

    let first = stack.orchestrator.verify_payment(req.clone()).await.unwrap();
    assert!(!first.already_confirmed);

    let second = stack.orchestrator.verify_payment(req.clone()).await.unwrap();
    assert!(second.already_confirmed);
    assert_eq!(second.intent.id, first.intent.id);

    // Seat count did not double.
    assert_eq!(grid_of(&stack.store, show_id).await.booked_count(), 1);

    // A different payment id against the confirmed booking is refused.
    let mut other = req;
    other.gateway_payment_id = "pay_2".into();
    assert!(matches!(
        stack.orchestrator.verify_payment(other).await.unwrap_err(),
        BookingError::AlreadyPaid
    ));
}

/// A bad signature fails the intent, keeps the booking pending and returns
/// the seats to the pool; the dead hold cannot restart payment.
#[tokio::test]
async fn failed_verification_releases_the_hold() {
    init_tracing();
    let razorpay = Arc::new(RazorpayGateway::new("rzp_test_secret"));
    let stack = stack_with(razorpay);
    let show_id = seed_show(&stack.store, 100, 2, 2).await;
    let user = stack.store.seed_user("x@example.com").await;

    let booking = stack
        .orchestrator
        .hold_seats(hold(show_id, user, &["A1", "B1"], 200))
        .await
        .unwrap();
    let handle = stack
        .orchestrator
        .initiate_payment(booking.id, user)
        .await
        .unwrap();

    let err = stack
        .orchestrator
        .verify_payment(VerifyRequest {
            booking_id: booking.id,
            user_id: user,
            gateway_order_id: handle.intent.gateway_order_id.clone(),
            gateway_payment_id: "pay_1".into(),
            proof: "deadbeef".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::GatewayVerification(_)));

    // Seats went back to the pool, the booking stayed pending.
    let grid = grid_of(&stack.store, show_id).await;
    assert!(grid.is_available("A1".parse().unwrap()));
    assert!(grid.is_available("B1".parse().unwrap()));
    let after = stack.store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(after.status, BookingStatus::Pending);

    // The intent is terminally failed.
    let intent = stack
        .store
        .find_by_order_id(&handle.intent.gateway_order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intent.status, IntentStatus::Failed);

    // The released hold cannot re-enter payment; the client re-selects.
    assert!(matches!(
        stack
            .orchestrator
            .initiate_payment(booking.id, user)
            .await
            .unwrap_err(),
        BookingError::Validation(_)
    ));

    // Someone else can take the freed seats immediately.
    let other = stack.store.seed_user("y@example.com").await;
    stack
        .orchestrator
        .hold_seats(hold(show_id, other, &["A1", "B1"], 200))
        .await
        .unwrap();
}

/// The Stripe-style gateway only confirms after the intent settled.
#[tokio::test]
async fn stripe_verification_follows_intent_settlement() {
    let stripe = Arc::new(StripeGateway::new());
    let stack = stack_with(stripe.clone());
    let show_id = seed_show(&stack.store, 150, 2, 2).await;
    let user = stack.store.seed_user("x@example.com").await;

    let booking = stack
        .orchestrator
        .hold_seats(hold(show_id, user, &["B2"], 150))
        .await
        .unwrap();
    let handle = stack
        .orchestrator
        .initiate_payment(booking.id, user)
        .await
        .unwrap();
    let order_id = handle.intent.gateway_order_id.clone();
    assert!(handle.intent.client_payload["client_secret"]
        .as_str()
        .unwrap()
        .starts_with(&order_id));

    // Client confirmed with Stripe out of band.
    stripe.settle(&order_id, true).await.unwrap();

    let confirmation = stack
        .orchestrator
        .verify_payment(VerifyRequest {
            booking_id: booking.id,
            user_id: user,
            gateway_order_id: order_id.clone(),
            gateway_payment_id: order_id.clone(),
            proof: "".into(),
        })
        .await
        .unwrap();
    assert_eq!(confirmation.booking.status, BookingStatus::Booked);
}

/// Counter bookings share the conflict-checked hold and settle later.
#[tokio::test]
async fn counter_path_books_immediately_and_settles_later() {
    let stack = stack_with(Arc::new(CinePayGateway));
    let show_id = seed_show(&stack.store, 100, 2, 2).await;
    let user = stack.store.seed_user("x@example.com").await;
    let other = stack.store.seed_user("y@example.com").await;

    // An online hold already owns A1: the counter request must conflict.
    stack
        .orchestrator
        .hold_seats(hold(show_id, other, &["A1"], 100))
        .await
        .unwrap();
    let err = stack
        .orchestrator
        .confirm_at_counter(hold(show_id, user, &["A1"], 100))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatConflict { .. }));

    let booking = stack
        .orchestrator
        .confirm_at_counter(hold(show_id, user, &["B1", "B2"], 200))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Booked);
    assert_eq!(booking.payment_status, SettlementStatus::Pending);

    // Paying online against a counter booking is refused.
    assert!(stack
        .orchestrator
        .initiate_payment(booking.id, user)
        .await
        .is_err());

    let settled = stack
        .orchestrator
        .mark_paid_at_theater(booking.id, user)
        .await
        .unwrap();
    assert_eq!(settled.payment_status, SettlementStatus::PaidAtTheater);

    assert_eq!(grid_of(&stack.store, show_id).await.booked_count(), 2);
}

/// An unpaid hold past the TTL is swept: seats available again, booking
/// cancelled, intent closed.
#[tokio::test]
async fn sweeper_reclaims_stale_holds() {
    init_tracing();
    let stack = stack_with(Arc::new(CinePayGateway));
    let show_id = seed_show(&stack.store, 100, 2, 2).await;
    let user = stack.store.seed_user("x@example.com").await;

    let booking = stack
        .orchestrator
        .hold_seats(hold(show_id, user, &["A1", "A2"], 200))
        .await
        .unwrap();
    let handle = stack
        .orchestrator
        .initiate_payment(booking.id, user)
        .await
        .unwrap();

    // Age the hold past the 15-minute window.
    let mut aged = stack.store.get_booking(booking.id).await.unwrap().unwrap();
    aged.created_at = Utc::now() - Duration::minutes(20);
    stack.store.update_booking(aged).await.unwrap();

    let swept = stack.sweeper.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(swept, 1);

    let grid = grid_of(&stack.store, show_id).await;
    assert!(grid.is_available("A1".parse().unwrap()));
    assert!(grid.is_available("A2".parse().unwrap()));

    let after = stack.store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(after.status, BookingStatus::Cancelled);

    let intent = stack
        .store
        .find_by_order_id(&handle.intent.gateway_order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intent.status, IntentStatus::Failed);
    assert_eq!(intent.failure_reason.as_deref(), Some("hold expired"));

    // Fresh holds still under the TTL are untouched.
    let fresh = stack
        .orchestrator
        .hold_seats(hold(show_id, user, &["B1"], 100))
        .await
        .unwrap();
    assert_eq!(stack.sweeper.sweep_once(Utc::now()).await.unwrap(), 0);
    let kept = stack.store.get_booking(fresh.id).await.unwrap().unwrap();
    assert_eq!(kept.status, BookingStatus::Pending);
}

/// Booked cells always reconcile with confirmed bookings, across confirmed,
/// pending, failed and swept reservations.
#[tokio::test]
async fn booked_cells_match_confirmed_bookings() {
    let stack = stack_with(Arc::new(CinePayGateway));
    let show_id = seed_show(&stack.store, 100, 3, 4).await;
    let user_x = stack.store.seed_user("x@example.com").await;
    let user_y = stack.store.seed_user("y@example.com").await;

    // One confirmed online booking.
    let paid = stack
        .orchestrator
        .hold_seats(hold(show_id, user_x, &["A1", "A2"], 200))
        .await
        .unwrap();
    let handle = stack
        .orchestrator
        .initiate_payment(paid.id, user_x)
        .await
        .unwrap();
    stack
        .orchestrator
        .verify_payment(VerifyRequest {
            booking_id: paid.id,
            user_id: user_x,
            gateway_order_id: handle.intent.gateway_order_id,
            gateway_payment_id: "pay_1".into(),
            proof: "".into(),
        })
        .await
        .unwrap();

    // One confirmed counter booking.
    stack
        .orchestrator
        .confirm_at_counter(hold(show_id, user_y, &["C4"], 100))
        .await
        .unwrap();

    // One hold still pending and one abandoned.
    stack
        .orchestrator
        .hold_seats(hold(show_id, user_y, &["B1", "B2"], 200))
        .await
        .unwrap();
    let abandoned = stack
        .orchestrator
        .hold_seats(hold(show_id, user_x, &["B3"], 100))
        .await
        .unwrap();
    stack.orchestrator.abandon(abandoned.id, user_x).await.unwrap();

    let grid = grid_of(&stack.store, show_id).await;
    let confirmed_seats: usize = stack
        .store
        .bookings_for_show(show_id)
        .await
        .unwrap()
        .iter()
        .filter(|b| b.status == BookingStatus::Booked)
        .map(|b| b.seats.len())
        .sum();
    assert_eq!(grid.booked_count(), confirmed_seats);
    assert_eq!(grid.booked_count(), 3);
    // The abandoned seat is selectable again.
    assert!(grid.is_available("B3".parse().unwrap()));
}

/// Foreign bookings are invisible: acting on someone else's booking is
/// indistinguishable from a missing one.
#[tokio::test]
async fn foreign_bookings_stay_invisible() {
    let stack = stack_with(Arc::new(CinePayGateway));
    let show_id = seed_show(&stack.store, 100, 2, 2).await;
    let owner = stack.store.seed_user("x@example.com").await;
    let intruder = stack.store.seed_user("y@example.com").await;

    let booking = stack
        .orchestrator
        .hold_seats(hold(show_id, owner, &["A1"], 100))
        .await
        .unwrap();

    assert!(matches!(
        stack
            .orchestrator
            .initiate_payment(booking.id, intruder)
            .await
            .unwrap_err(),
        BookingError::Unauthorized
    ));
    assert!(matches!(
        stack
            .orchestrator
            .abandon(booking.id, intruder)
            .await
            .unwrap_err(),
        BookingError::Unauthorized
    ));
    assert!(matches!(
        stack
            .orchestrator
            .initiate_payment(Uuid::new_v4(), intruder)
            .await
            .unwrap_err(),
        BookingError::NotFound(_)
    ));
}
