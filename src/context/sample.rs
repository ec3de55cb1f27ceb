use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::airlines::Alliance;
use crate::context::{
    CabinClass, LegContext, LodgingRate, PricedOption, RateConfidence, TravelerProfile,
    TripContext,
};

/// Builds a nonstop option in premium economy departing at `departure`
/// (`%Y-%m-%dT%H:%M`). Unparseable timestamps fall back to the epoch.
pub fn option(id: &str, airline: &str, departure: &str, price: f64) -> PricedOption {
    let departure = NaiveDateTime::parse_from_str(departure, "%Y-%m-%dT%H:%M").unwrap_or_default();
    PricedOption {
        id: id.to_string(),
        airline_code: airline.to_string(),
        airline_name: airline_display_name(airline).to_string(),
        flight_numbers: vec![format!("{airline}{}", 100 + id.len() * 7)],
        origin: "SFO".to_string(),
        destination: "JFK".to_string(),
        departure,
        arrival: departure + chrono::Duration::minutes(330),
        duration_minutes: 330,
        stops: 0,
        stop_airports: Vec::new(),
        price,
        currency: "USD".to_string(),
        cabin: CabinClass::PremiumEconomy,
        is_alternate_airport: false,
        is_alternate_date: false,
    }
}

fn reversed(mut option: PricedOption) -> PricedOption {
    std::mem::swap(&mut option.origin, &mut option.destination);
    option
}

fn with_stop(mut option: PricedOption, via: &str) -> PricedOption {
    option.stops = 1;
    option.stop_airports = vec![via.to_string()];
    option.duration_minutes += 95;
    option.arrival += chrono::Duration::minutes(95);
    option
}

fn in_cabin(mut option: PricedOption, cabin: CabinClass) -> PricedOption {
    option.cabin = cabin;
    option
}

fn from_airport(mut option: PricedOption, origin: &str) -> PricedOption {
    option.origin = origin.to_string();
    option.is_alternate_airport = true;
    option
}

fn airline_display_name(code: &str) -> &'static str {
    match code {
        "UA" => "United Airlines",
        "DL" => "Delta Air Lines",
        "AA" => "American Airlines",
        "B6" => "JetBlue",
        "AS" => "Alaska Airlines",
        "NK" => "Spirit Airlines",
        "AC" => "Air Canada",
        _ => "Unknown Carrier",
    }
}

/// A Monday-to-Friday SFO/JFK round trip with a priced option pool that
/// exercises every generation layer and both proposal categories.
pub fn sample_round_trip() -> TripContext {
    let outbound_selected = option("OUT-UA-0302", "UA", "2026-03-02T08:00", 620.0);
    let return_selected = reversed(option("RET-UA-0306", "UA", "2026-03-06T18:00", 640.0));

    let outbound_options = vec![
        outbound_selected.clone(),
        option("OUT-DL-0302", "DL", "2026-03-02T09:15", 480.0),
        option("OUT-B6-0302", "B6", "2026-03-02T07:05", 450.0),
        option("OUT-AA-0302", "AA", "2026-03-02T11:40", 560.0),
        option("OUT-AC-0302", "AC", "2026-03-02T13:10", 540.0),
        option("OUT-NK-0302", "NK", "2026-03-02T06:00", 300.0),
        with_stop(option("OUT-UA-0302-ORD", "UA", "2026-03-02T06:45", 520.0), "ORD"),
        from_airport(option("OUT-AS-0302-OAK", "AS", "2026-03-02T10:20", 430.0), "OAK"),
        in_cabin(
            option("OUT-UA-0302-Y", "UA", "2026-03-02T08:00", 380.0),
            CabinClass::Economy,
        ),
        in_cabin(
            option("OUT-DL-0302-Y", "DL", "2026-03-02T09:15", 350.0),
            CabinClass::Economy,
        ),
        option("OUT-UA-0301", "UA", "2026-03-01T08:00", 500.0),
        option("OUT-UA-0303", "UA", "2026-03-03T08:00", 470.0),
        option("OUT-UA-0309", "UA", "2026-03-09T08:00", 400.0),
        option("OUT-DL-0309", "DL", "2026-03-09T09:15", 390.0),
        option("OUT-B6-0309", "B6", "2026-03-09T07:05", 420.0),
        option("OUT-UA-0406", "UA", "2026-04-06T08:00", 350.0),
    ];

    let return_options = vec![
        return_selected.clone(),
        reversed(option("RET-DL-0306", "DL", "2026-03-06T17:30", 500.0)),
        reversed(option("RET-B6-0306-RE", "B6", "2026-03-06T23:30", 430.0)),
        reversed(with_stop(
            option("RET-UA-0306-DEN", "UA", "2026-03-06T15:20", 540.0),
            "DEN",
        )),
        reversed(in_cabin(
            option("RET-UA-0306-Y", "UA", "2026-03-06T18:00", 400.0),
            CabinClass::Economy,
        )),
        reversed(in_cabin(
            option("RET-DL-0306-Y", "DL", "2026-03-06T17:30", 390.0),
            CabinClass::Economy,
        )),
        reversed(option("RET-UA-0305", "UA", "2026-03-05T18:00", 520.0)),
        reversed(option("RET-UA-0307", "UA", "2026-03-07T18:00", 480.0)),
        reversed(option("RET-UA-0313", "UA", "2026-03-13T18:00", 410.0)),
        reversed(option("RET-DL-0313", "DL", "2026-03-13T17:30", 380.0)),
        reversed(option("RET-B6-0313", "B6", "2026-03-13T19:10", 400.0)),
        reversed(option("RET-UA-0410", "UA", "2026-04-10T18:00", 360.0)),
    ];

    TripContext {
        trip_id: "TRIP-SAMPLE-001".to_string(),
        traveler: TravelerProfile {
            id: "EMP-1042".to_string(),
            role: "account_manager".to_string(),
            excluded_airlines: BTreeSet::from(["NK".to_string()]),
            preferred_alliances: vec![Alliance::StarAlliance],
            loyalty_airlines: BTreeSet::from(["UA".to_string()]),
        },
        legs: vec![
            LegContext {
                leg_id: "leg-1".to_string(),
                origin: "SFO".to_string(),
                destination: "JFK".to_string(),
                preferred_date: date(2026, 3, 2),
                flexibility_days: 2,
                cabin: CabinClass::PremiumEconomy,
                passengers: 1,
                selected: Some(outbound_selected),
                options: outbound_options,
                lodging: LodgingRate {
                    nightly_rate: Some(250.0),
                    chain: Some("Marriott".to_string()),
                    confidence: RateConfidence::Known,
                },
            },
            LegContext {
                leg_id: "leg-2".to_string(),
                origin: "JFK".to_string(),
                destination: "SFO".to_string(),
                preferred_date: date(2026, 3, 6),
                flexibility_days: 2,
                cabin: CabinClass::PremiumEconomy,
                passengers: 1,
                selected: Some(return_selected),
                options: return_options,
                lodging: LodgingRate::default(),
            },
        ],
        trip_duration_days: Some(4),
        nearby_events: vec!["Industry conference at Javits Center, Mar 3-5".to_string()],
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
