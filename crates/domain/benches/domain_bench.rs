use chrono::Utc;
use common::EntityId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Money, Order, Product, ProductCatalog};
use storage::InMemoryTableStore;

fn make_order(quantity: u32) -> Order {
    Order {
        id: EntityId::new(),
        customer_id: EntityId::new(),
        product_id: EntityId::new(),
        quantity,
        status: Order::DEFAULT_STATUS.to_string(),
        order_date: Utc::now(),
        unit_price: Money::from_cents(1250),
        product_name: "Benchmark Widget".to_string(),
        customer_name: "Ada Lovelace".to_string(),
        username: "ada".to_string(),
    }
}

fn bench_order_total(c: &mut Criterion) {
    let order = make_order(7);

    c.bench_function("domain/order_total_price", |b| {
        b.iter(|| order.total_price());
    });
}

fn bench_order_serialization(c: &mut Criterion) {
    let order = make_order(3);

    c.bench_function("domain/order_to_json", |b| {
        b.iter(|| serde_json::to_value(&order).unwrap());
    });
}

fn bench_catalog_add_and_get(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/catalog_add_and_get", |b| {
        b.iter(|| {
            rt.block_on(async {
                let catalog = ProductCatalog::new(InMemoryTableStore::new());
                let product = Product {
                    id: EntityId::new(),
                    name: "Benchmark Widget".to_string(),
                    description: "bench".to_string(),
                    price: Money::from_cents(1000),
                    stock_quantity: 10,
                    image_url: String::new(),
                };
                let id = product.id;
                catalog.add(product).await.unwrap();
                catalog.get(id).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_order_total,
    bench_order_serialization,
    bench_catalog_add_and_get
);
criterion_main!(benches);
