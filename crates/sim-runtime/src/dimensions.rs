//! Reference dimension tables: products, the warehouse network, suppliers,
//! drivers, customers, experiments and the calendar.
//!
//! Warehouses and suppliers are fixed; everything else is drawn from the
//! run's random stream so a seed reproduces the whole dimension set.

use crate::config::{DimensionParams, ExtensionParams, SimParams};
use chrono::{Datelike, Duration, NaiveDate};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sim_core::{
    CalendarDay, Customer, CustomerId, Dimensions, Driver, DriverId, DriverStatus, Experiment,
    ExperimentId, Product, ProductId, Supplier, SupplierId, VehicleType, Warehouse, WarehouseId,
};
use sim_econ::{jitter_location, round2, US_HOLIDAYS};
use tracing::{debug, info};

struct CategorySpec {
    name: &'static str,
    subcategories: &'static [&'static str],
    count: u32,
    price: (f64, f64),
    weight: (f64, f64),
    lead_days: (u32, u32),
    perishable: bool,
}

const CATEGORIES: [CategorySpec; 8] = [
    CategorySpec {
        name: "Electronics",
        subcategories: &["Smartphones", "Laptops", "Headphones", "Tablets", "Cameras", "Chargers"],
        count: 75,
        price: (15.0, 500.0),
        weight: (0.1, 5.0),
        lead_days: (3, 10),
        perishable: false,
    },
    CategorySpec {
        name: "Grocery",
        subcategories: &["Snacks", "Beverages", "Dairy", "Canned Goods", "Frozen", "Condiments"],
        count: 70,
        price: (1.5, 25.0),
        weight: (0.2, 8.0),
        lead_days: (1, 5),
        perishable: true,
    },
    CategorySpec {
        name: "Apparel",
        subcategories: &["Men's Clothing", "Women's Clothing", "Shoes", "Accessories", "Activewear"],
        count: 65,
        price: (8.0, 120.0),
        weight: (0.1, 2.0),
        lead_days: (3, 8),
        perishable: false,
    },
    CategorySpec {
        name: "Home & Garden",
        subcategories: &["Furniture", "Kitchen", "Bedding", "Tools", "Decor", "Lighting"],
        count: 65,
        price: (5.0, 300.0),
        weight: (0.5, 25.0),
        lead_days: (5, 14),
        perishable: false,
    },
    CategorySpec {
        name: "Health",
        subcategories: &["Vitamins", "Personal Care", "First Aid", "Fitness", "Supplements"],
        count: 60,
        price: (3.0, 60.0),
        weight: (0.1, 3.0),
        lead_days: (2, 7),
        perishable: false,
    },
    CategorySpec {
        name: "Toys",
        subcategories: &["Action Figures", "Board Games", "Puzzles", "Outdoor Toys", "Educational"],
        count: 55,
        price: (5.0, 80.0),
        weight: (0.2, 5.0),
        lead_days: (3, 10),
        perishable: false,
    },
    CategorySpec {
        name: "Sports",
        subcategories: &["Equipment", "Footwear", "Apparel", "Accessories", "Nutrition"],
        count: 55,
        price: (10.0, 200.0),
        weight: (0.3, 15.0),
        lead_days: (3, 10),
        perishable: false,
    },
    CategorySpec {
        name: "Beauty",
        subcategories: &["Skincare", "Makeup", "Hair Care", "Fragrances", "Bath & Body"],
        count: 55,
        price: (4.0, 75.0),
        weight: (0.1, 2.0),
        lead_days: (2, 7),
        perishable: false,
    },
];

const NOMINAL_PRODUCTS: f64 = 500.0;
const MARKUP: (f64, f64) = (1.25, 2.50);
const REORDER_POINT: (u32, u32) = (20, 100);
const SAFETY_STOCK: (u32, u32) = (10, 50);

struct Site {
    id: &'static str,
    name: &'static str,
    region: &'static str,
    city: &'static str,
    state: &'static str,
    lat: f64,
    lon: f64,
    capacity: u32,
    daily_cost_cents: i64,
    drivers: u32,
    nearby: [&'static str; 6],
}

const SITES: [Site; 8] = [
    Site {
        id: "WH-001",
        name: "NYC-East",
        region: "Northeast",
        city: "Newark",
        state: "NJ",
        lat: 40.735657,
        lon: -74.172367,
        capacity: 75_000,
        daily_cost_cents: 450_000,
        drivers: 40,
        nearby: ["New York", "Newark", "Jersey City", "Brooklyn", "Stamford", "Hoboken"],
    },
    Site {
        id: "WH-002",
        name: "LA-West",
        region: "West",
        city: "Los Angeles",
        state: "CA",
        lat: 33.942791,
        lon: -118.267586,
        capacity: 80_000,
        daily_cost_cents: 500_000,
        drivers: 42,
        nearby: ["Los Angeles", "Long Beach", "Pasadena", "Glendale", "Santa Monica", "Burbank"],
    },
    Site {
        id: "WH-003",
        name: "CHI-Central",
        region: "Midwest",
        city: "Chicago",
        state: "IL",
        lat: 41.878114,
        lon: -87.629798,
        capacity: 70_000,
        daily_cost_cents: 400_000,
        drivers: 38,
        nearby: ["Chicago", "Naperville", "Aurora", "Evanston", "Schaumburg", "Joliet"],
    },
    Site {
        id: "WH-004",
        name: "DAL-South",
        region: "South",
        city: "Dallas",
        state: "TX",
        lat: 32.776664,
        lon: -96.796988,
        capacity: 72_000,
        daily_cost_cents: 380_000,
        drivers: 36,
        nearby: ["Dallas", "Fort Worth", "Arlington", "Plano", "Garland", "Irving"],
    },
    Site {
        id: "WH-005",
        name: "SEA-NW",
        region: "Northwest",
        city: "Seattle",
        state: "WA",
        lat: 47.606209,
        lon: -122.332071,
        capacity: 60_000,
        daily_cost_cents: 420_000,
        drivers: 34,
        nearby: ["Seattle", "Tacoma", "Bellevue", "Everett", "Renton", "Redmond"],
    },
    Site {
        id: "WH-006",
        name: "MIA-SE",
        region: "Southeast",
        city: "Miami",
        state: "FL",
        lat: 25.761680,
        lon: -80.191790,
        capacity: 65_000,
        daily_cost_cents: 360_000,
        drivers: 35,
        nearby: ["Miami", "Fort Lauderdale", "Hollywood", "Hialeah", "Coral Springs", "Boca Raton"],
    },
    Site {
        id: "WH-007",
        name: "DEN-Mountain",
        region: "Mountain",
        city: "Denver",
        state: "CO",
        lat: 39.739236,
        lon: -104.990251,
        capacity: 58_000,
        daily_cost_cents: 340_000,
        drivers: 33,
        nearby: ["Denver", "Aurora", "Lakewood", "Boulder", "Thornton", "Arvada"],
    },
    Site {
        id: "WH-008",
        name: "ATL-Mid",
        region: "Mid-Atlantic",
        city: "Atlanta",
        state: "GA",
        lat: 33.748996,
        lon: -84.387982,
        capacity: 68_000,
        daily_cost_cents: 370_000,
        drivers: 37,
        nearby: ["Atlanta", "Marietta", "Roswell", "Sandy Springs", "Alpharetta", "Decatur"],
    },
];

// (name, region, lead time, std dev, reliability, categories)
const SUPPLIERS: [(&str, &str, u32, f64, f64, &str); 6] = [
    ("FastShip Co", "Northeast", 4, 1.2, 0.92, "Electronics,Toys"),
    ("GlobalParts Inc", "West", 6, 2.0, 0.85, "Electronics,Sports"),
    ("PrimeDistributors", "Southeast", 3, 0.8, 0.95, "Grocery,Health"),
    ("EcoSupply Ltd", "Midwest", 5, 1.5, 0.88, "Home & Garden,Beauty"),
    ("MegaLogistics", "South", 7, 2.5, 0.80, "Apparel,Home & Garden"),
    ("SwiftFreight", "Northwest", 4, 1.0, 0.93, "Beauty,Health,Grocery"),
];

// (vehicle, share, capacity range, speed range)
const VEHICLES: [(VehicleType, f64, (u32, u32), (f64, f64)); 4] = [
    (VehicleType::Van, 0.45, (15, 25), (30.0, 50.0)),
    (VehicleType::Truck, 0.25, (25, 40), (25.0, 40.0)),
    (VehicleType::Car, 0.20, (8, 15), (35.0, 55.0)),
    (VehicleType::Bike, 0.10, (3, 8), (15.0, 25.0)),
];

const DRIVER_STATUSES: [(DriverStatus, f64); 3] = [
    (DriverStatus::Active, 0.85),
    (DriverStatus::OnLeave, 0.10),
    (DriverStatus::Inactive, 0.05),
];

const FIRST_NAMES: [&str; 20] = [
    "James", "Mary", "John", "Patricia", "Robert", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "Carlos", "Maria", "Wei", "Li", "Ahmed", "Fatima", "Raj", "Priya", "Kenji", "Olga",
];

const LAST_NAMES: [&str; 20] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Wilson", "Lee", "Kim", "Chen", "Wang", "Patel", "Singh", "Tanaka", "Petrov",
    "Nguyen",
];

// (segment, share, frequency score range)
const SEGMENTS: [(&str, f64, (f64, f64)); 3] = [
    ("Premium", 0.15, (0.70, 1.00)),
    ("Regular", 0.55, (0.30, 0.69)),
    ("Occasional", 0.30, (0.05, 0.29)),
];

// (name, strategy, type, target warehouses, start (y, m, d))
const EXPERIMENTS: [(&str, &str, &str, &str, (i32, u32, u32)); 10] = [
    (
        "Inventory Policy: Dynamic vs Static Reorder",
        "dynamic_reorder",
        "inventory_policy",
        "WH-001,WH-002,WH-003,WH-004",
        (2022, 6, 1),
    ),
    (
        "Inventory Policy: Safety Stock +20%",
        "high_safety_stock",
        "inventory_policy",
        "WH-005,WH-006,WH-007,WH-008",
        (2022, 9, 1),
    ),
    (
        "Routing: Greedy vs Balanced",
        "balanced_routing",
        "routing_algorithm",
        "WH-001,WH-002,WH-003,WH-004",
        (2023, 1, 1),
    ),
    (
        "Routing: Nearest Driver vs Load-Balanced",
        "load_balanced_driver",
        "routing_algorithm",
        "WH-005,WH-006,WH-007,WH-008",
        (2023, 4, 1),
    ),
    (
        "Allocation: Nearest vs Cost-Optimal Warehouse",
        "cost_optimal_allocation",
        "warehouse_allocation",
        "WH-001,WH-002,WH-003,WH-004,WH-005,WH-006,WH-007,WH-008",
        (2023, 7, 1),
    ),
    (
        "Allocation: Capacity-Aware Assignment",
        "capacity_aware",
        "warehouse_allocation",
        "WH-001,WH-003,WH-005,WH-007",
        (2023, 10, 1),
    ),
    (
        "Inventory Policy: Just-In-Time Reorder",
        "jit_reorder",
        "inventory_policy",
        "WH-002,WH-004,WH-006,WH-008",
        (2024, 1, 1),
    ),
    (
        "Routing: Priority-Based Driver Assignment",
        "priority_routing",
        "routing_algorithm",
        "WH-001,WH-002,WH-005,WH-006",
        (2024, 4, 1),
    ),
    (
        "Allocation: Region-Locked vs Flexible",
        "flexible_allocation",
        "warehouse_allocation",
        "WH-003,WH-004,WH-007,WH-008",
        (2024, 7, 1),
    ),
    (
        "Inventory Policy: ML-Driven Reorder Points",
        "ml_reorder",
        "inventory_policy",
        "WH-001,WH-002,WH-003,WH-004,WH-005,WH-006,WH-007,WH-008",
        (2024, 10, 1),
    ),
];

/// Experiments before this index run a fixed window; the rest are open-ended.
const CLOSED_EXPERIMENTS: usize = 8;
const EXPERIMENT_WINDOW_DAYS: i64 = 90;
const CUSTOMER_SPREAD_DEG: f64 = 1.2;

fn money(x: f64) -> Decimal {
    Decimal::from_f64(round2(x)).unwrap_or(Decimal::ZERO).round_dp(2)
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn scaled(count: u32, factor: f64) -> u32 {
    ((count as f64 * factor).round() as u32).max(1)
}

/// Pick from `(value, weight)` pairs by cumulative weight.
fn weighted<R: Rng + ?Sized, T: Copy>(rng: &mut R, table: &[(T, f64)]) -> T {
    let total: f64 = table.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen::<f64>() * total;
    for (v, w) in table {
        if roll < *w {
            return *v;
        }
        roll -= w;
    }
    table[table.len() - 1].0
}

/// Products per category, numbered `PROD-NNNN` across the whole table.
pub fn generate_products<R: Rng + ?Sized>(params: &DimensionParams, rng: &mut R) -> Vec<Product> {
    let factor = params.products as f64 / NOMINAL_PRODUCTS;
    let mut rows = Vec::with_capacity(params.products as usize);
    let mut n = 1u32;
    for cat in &CATEGORIES {
        for _ in 0..scaled(cat.count, factor) {
            let subcategory = cat.subcategories.choose(rng).copied().unwrap_or(cat.name);
            let cost = round2(rng.gen_range(cat.price.0..cat.price.1));
            let markup = rng.gen_range(MARKUP.0..MARKUP.1);
            let weight = round2(rng.gen_range(cat.weight.0..cat.weight.1));
            let lead = rng.gen_range(cat.lead_days.0..=cat.lead_days.1);
            let reorder_point = rng.gen_range(REORDER_POINT.0..REORDER_POINT.1);
            let safety_stock = rng.gen_range(SAFETY_STOCK.0..SAFETY_STOCK.1);
            rows.push(Product {
                product_id: ProductId(format!("PROD-{n:04}")),
                product_name: format!("{subcategory} {}-{n:03}", &cat.name[..1]),
                category: cat.name.to_string(),
                subcategory: subcategory.to_string(),
                cost_price: money(cost),
                selling_price: money(cost * markup),
                weight_kg: weight,
                lead_time_days: lead,
                reorder_point,
                safety_stock,
                is_perishable: cat.perishable,
            });
            n += 1;
        }
    }
    rows
}

/// The eight regional fulfillment centers.
pub fn generate_warehouses() -> Vec<Warehouse> {
    SITES
        .iter()
        .map(|s| Warehouse {
            warehouse_id: WarehouseId::from(s.id),
            warehouse_name: s.name.to_string(),
            region: s.region.to_string(),
            city: s.city.to_string(),
            state: s.state.to_string(),
            latitude: s.lat,
            longitude: s.lon,
            capacity_units: s.capacity,
            operating_cost_per_day: Decimal::new(s.daily_cost_cents, 2),
        })
        .collect()
}

pub fn generate_suppliers() -> Vec<Supplier> {
    SUPPLIERS
        .iter()
        .enumerate()
        .map(|(i, (name, region, lead, std, reliability, cats))| Supplier {
            supplier_id: SupplierId(format!("SUP-{:03}", i + 1)),
            supplier_name: name.to_string(),
            region: region.to_string(),
            average_lead_time: *lead,
            lead_time_std_dev: *std,
            reliability_score: *reliability,
            product_categories: cats.to_string(),
        })
        .collect()
}

/// Drivers per warehouse, numbered `DRV-NNNN` in warehouse order.
pub fn generate_drivers<R: Rng + ?Sized>(params: &DimensionParams, rng: &mut R) -> Vec<Driver> {
    let mut rows = Vec::new();
    let mut n = 1u32;
    let epoch = ymd(2019, 1, 1);
    for site in &SITES {
        for _ in 0..scaled(site.drivers, params.driver_scale) {
            let vehicle = weighted(rng, &VEHICLES.map(|(v, p, _, _)| (v, p)));
            let (_, _, capacity, speed) = VEHICLES
                .iter()
                .find(|(v, ..)| *v == vehicle)
                .copied()
                .unwrap_or(VEHICLES[0]);
            let status = weighted(rng, &DRIVER_STATUSES);
            let hire_date = epoch + Duration::days(rng.gen_range(0..365 * 4));
            let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
            let last = LAST_NAMES.choose(rng).copied().unwrap_or("Doe");
            rows.push(Driver {
                driver_id: DriverId(format!("DRV-{n:04}")),
                warehouse_id: WarehouseId::from(site.id),
                driver_name: format!("{first} {last}"),
                vehicle_type: vehicle,
                max_delivery_capacity: rng.gen_range(capacity.0..=capacity.1),
                avg_speed_kmh: round2(rng.gen_range(speed.0..speed.1)),
                availability_status: status,
                hire_date,
            });
            n += 1;
        }
    }
    rows
}

/// Customers clustered around a random home warehouse.
pub fn generate_customers<R: Rng + ?Sized>(params: &DimensionParams, rng: &mut R) -> Vec<Customer> {
    let count = params.customers.max(1);
    let epoch = ymd(2020, 1, 1);
    let mut rows = Vec::with_capacity(count as usize);
    for i in 0..count {
        let site = &SITES[rng.gen_range(0..SITES.len())];
        let city = site.nearby.choose(rng).copied().unwrap_or(site.city);
        let segment = weighted(rng, &SEGMENTS.map(|(s, p, _)| (s, p)));
        let (_, _, freq) = SEGMENTS
            .iter()
            .find(|(s, ..)| *s == segment)
            .copied()
            .unwrap_or(SEGMENTS[1]);
        let score = round2(rng.gen_range(freq.0..freq.1));
        let acquisition_date = epoch + Duration::days(rng.gen_range(0..365 * 4));
        let (latitude, longitude) = jitter_location(rng, site.lat, site.lon, CUSTOMER_SPREAD_DEG);
        rows.push(Customer {
            customer_id: CustomerId(format!("CUST-{:05}", i + 1)),
            region: site.region.to_string(),
            city: city.to_string(),
            customer_segment: segment.to_string(),
            order_frequency_score: score,
            acquisition_date,
            latitude,
            longitude,
        });
    }
    rows
}

pub fn generate_experiments() -> Vec<Experiment> {
    EXPERIMENTS
        .iter()
        .enumerate()
        .map(|(i, (name, strategy, kind, targets, (y, m, d)))| {
            let start = ymd(*y, *m, *d);
            let closed = i < CLOSED_EXPERIMENTS;
            Experiment {
                experiment_id: ExperimentId(format!("EXP-{:03}", i + 1)),
                experiment_name: name.to_string(),
                strategy_name: strategy.to_string(),
                experiment_type: kind.to_string(),
                start_date: start,
                end_date: closed.then(|| start + Duration::days(EXPERIMENT_WINDOW_DAYS)),
                target_warehouses: targets.to_string(),
                status: if closed { "Completed" } else { "Active" }.to_string(),
            }
        })
        .collect()
}

fn season(month: u32) -> &'static str {
    match month {
        3..=5 => "Spring",
        6..=8 => "Summer",
        9..=11 => "Fall",
        _ => "Winter",
    }
}

/// One row per day from `start` to `end`, inclusive.
pub fn generate_calendar(start: NaiveDate, end: NaiveDate) -> Vec<CalendarDay> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|d| {
            let iso_dow = d.weekday().number_from_monday();
            CalendarDay {
                date: d,
                day_of_week: d.format("%A").to_string(),
                day_of_week_num: iso_dow,
                week_number: d.iso_week().week(),
                month: d.month(),
                month_name: d.format("%B").to_string(),
                quarter: (d.month() - 1) / 3 + 1,
                year: d.year(),
                is_holiday: US_HOLIDAYS.contains(&(d.month(), d.day())),
                is_weekend: iso_dow >= 6,
                season: season(d.month()).to_string(),
            }
        })
        .collect()
}

/// Build every dimension table for a run.
///
/// Example:
/// let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
/// let dims = generate_dimensions(&params, &mut rng);
/// assert_eq!(dims.warehouses.len(), 8);
pub fn generate_dimensions<R: Rng + ?Sized>(params: &SimParams, rng: &mut R) -> Dimensions {
    let dims = Dimensions {
        products: generate_products(&params.dimensions, rng),
        warehouses: generate_warehouses(),
        suppliers: generate_suppliers(),
        drivers: generate_drivers(&params.dimensions, rng),
        customers: generate_customers(&params.dimensions, rng),
        experiments: generate_experiments(),
        calendar: generate_calendar(params.start_date, params.end_date),
    };
    debug!(
        products = dims.products.len(),
        drivers = dims.drivers.len(),
        customers = dims.customers.len(),
        "dimensions generated"
    );
    dims
}

/// How many rows each kind of extension change touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionChanges {
    pub price_changes: usize,
    pub safety_stock_changes: usize,
    pub reorder_point_changes: usize,
    pub reliability_degraded: usize,
    pub reliability_improved: usize,
    pub lead_time_changes: usize,
    pub drivers_on_leave: usize,
    pub vehicle_upgrades: usize,
    pub occasional_to_regular: usize,
    pub regular_to_premium: usize,
}

/// `k` distinct positions out of `of` (fewer when the table is smaller).
fn pick<R: Rng + ?Sized>(rng: &mut R, of: usize, k: u32) -> Vec<usize> {
    index::sample(rng, of, (k as usize).min(of)).into_vec()
}

/// Positions of the rows matching `keep`, `k` of them drawn at random.
fn pick_where<R: Rng + ?Sized, T>(
    rng: &mut R,
    rows: &[T],
    k: u32,
    keep: impl Fn(&T) -> bool,
) -> Vec<usize> {
    let eligible: Vec<usize> = (0..rows.len()).filter(|&i| keep(&rows[i])).collect();
    pick(rng, eligible.len(), k)
        .into_iter()
        .map(|i| eligible[i])
        .collect()
}

fn scale_units(units: u32, factor: f64) -> u32 {
    (units as f64 * factor).round().max(0.0) as u32
}

fn segment_score<R: Rng + ?Sized>(rng: &mut R, segment: &str) -> f64 {
    let (_, _, range) = SEGMENTS
        .iter()
        .find(|(s, ..)| *s == segment)
        .copied()
        .unwrap_or(SEGMENTS[1]);
    round2(rng.gen_range(range.0..range.1))
}

/// Shift products, suppliers, drivers and customers into their extension
/// period state. Ids, row counts and warehouse assignments never change.
pub fn apply_extension_changes<R: Rng + ?Sized>(
    dims: &mut Dimensions,
    params: &ExtensionParams,
    rng: &mut R,
) -> ExtensionChanges {
    let mut changes = ExtensionChanges::default();

    let n = dims.products.len();
    for i in pick(rng, n, params.price_changes) {
        let factor = Decimal::from_f64(params.price_increase.sample(rng)).unwrap_or(Decimal::ONE);
        let p = &mut dims.products[i];
        p.cost_price = (p.cost_price * factor).round_dp(2);
        p.selling_price = (p.selling_price * factor).round_dp(2);
        changes.price_changes += 1;
    }
    for i in pick(rng, n, params.safety_stock_changes) {
        let p = &mut dims.products[i];
        p.safety_stock = scale_units(p.safety_stock, params.safety_stock_increase.sample(rng));
        changes.safety_stock_changes += 1;
    }
    for i in pick(rng, n, params.reorder_point_changes) {
        let p = &mut dims.products[i];
        p.reorder_point = scale_units(p.reorder_point, params.reorder_point_adjust.sample(rng));
        changes.reorder_point_changes += 1;
    }

    let (lo, hi) = (params.reliability_bounds.min, params.reliability_bounds.max);
    let mut order: Vec<usize> = (0..dims.suppliers.len()).collect();
    order.shuffle(rng);
    let degraded = (params.reliability_degraded as usize).min(order.len());
    let improved = (params.reliability_improved as usize).min(order.len() - degraded);
    for &i in &order[..degraded] {
        let s = &mut dims.suppliers[i];
        let dropped = s.reliability_score - params.reliability_drop.sample(rng);
        s.reliability_score = round2(dropped.clamp(lo, hi));
        changes.reliability_degraded += 1;
    }
    for &i in &order[degraded..degraded + improved] {
        let s = &mut dims.suppliers[i];
        let raised = s.reliability_score + params.reliability_gain.sample(rng);
        s.reliability_score = round2(raised.clamp(lo, hi));
        changes.reliability_improved += 1;
    }
    let delta = i64::from(params.lead_time_max_delta);
    let bounds = params.lead_time_bounds;
    for i in pick(rng, dims.suppliers.len(), params.lead_time_changes) {
        let s = &mut dims.suppliers[i];
        let shifted = i64::from(s.average_lead_time) + rng.gen_range(-delta..=delta);
        s.average_lead_time = shifted.clamp(i64::from(bounds.min), i64::from(bounds.max)) as u32;
        changes.lead_time_changes += 1;
    }

    for i in pick_where(rng, &dims.drivers, params.drivers_on_leave, |d| {
        d.availability_status == DriverStatus::Active
    }) {
        dims.drivers[i].availability_status = DriverStatus::OnLeave;
        changes.drivers_on_leave += 1;
    }
    for i in pick_where(rng, &dims.drivers, params.vehicle_upgrades, |d| {
        matches!(d.vehicle_type, VehicleType::Car | VehicleType::Van)
    }) {
        let d = &mut dims.drivers[i];
        let upgraded = match d.vehicle_type {
            VehicleType::Car => VehicleType::Van,
            _ => VehicleType::Truck,
        };
        d.vehicle_type = upgraded;
        if let Some((_, _, capacity, _)) = VEHICLES.iter().find(|(v, ..)| *v == upgraded) {
            d.max_delivery_capacity = rng.gen_range(capacity.0..=capacity.1);
        }
        changes.vehicle_upgrades += 1;
    }

    for (from, to, count, tally) in [
        ("Occasional", "Regular", params.occasional_to_regular, &mut changes.occasional_to_regular),
        ("Regular", "Premium", params.regular_to_premium, &mut changes.regular_to_premium),
    ] {
        for i in pick_where(rng, &dims.customers, count, |c| c.customer_segment == from) {
            let c = &mut dims.customers[i];
            c.customer_segment = to.to_string();
            c.order_frequency_score = segment_score(rng, to);
            *tally += 1;
        }
    }

    info!(
        effective = %params.effective_date,
        products = changes.price_changes + changes.safety_stock_changes + changes.reorder_point_changes,
        suppliers = changes.reliability_degraded + changes.reliability_improved + changes.lead_time_changes,
        drivers = changes.drivers_on_leave + changes.vehicle_upgrades,
        customers = changes.occasional_to_regular + changes.regular_to_premium,
        "extension dimension changes applied"
    );
    changes
}
