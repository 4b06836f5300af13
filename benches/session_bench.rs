//! Session benchmarks: commit of a process instance aggregate and composite loads.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use widerow::types::{ExecutionEntity, VariableInstanceEntity};
use widerow::{Entity, MemoryStore, OperationRegistry, PersistenceConfig, PersistenceSession};

fn setup() -> (Arc<MemoryStore>, Arc<OperationRegistry>) {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(OperationRegistry::standard());
    registry.schema().create_schema(store.as_ref()).unwrap();
    (store, registry)
}

fn session(store: &Arc<MemoryStore>, registry: &Arc<OperationRegistry>) -> PersistenceSession {
    PersistenceSession::new(store.clone(), Arc::clone(registry), PersistenceConfig::default())
        .unwrap()
}

fn process_instance(id: &str, variables: usize) -> Vec<Entity> {
    let mut entities = vec![Entity::Execution(ExecutionEntity {
        id: id.to_string(),
        process_instance_id: id.to_string(),
        process_definition_id: "invoice:1".to_string(),
        is_active: true,
        is_scope: true,
        ..Default::default()
    })];
    for i in 0..variables {
        entities.push(Entity::VariableInstance(VariableInstanceEntity {
            id: format!("{}-v{}", id, i),
            name: format!("var{}", i),
            type_name: "long".to_string(),
            execution_id: Some(id.to_string()),
            process_instance_id: id.to_string(),
            long_value: Some(i as i64),
            ..Default::default()
        }));
    }
    entities
}

// ============================================================================
// Commit Benchmarks
// ============================================================================

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_process_instance");

    for variables in [0, 10, 100] {
        group.throughput(Throughput::Elements(variables as u64 + 1));
        group.bench_with_input(BenchmarkId::from_parameter(variables), &variables, |b, &n| {
            let (store, registry) = setup();
            let mut counter = 0u64;
            b.iter_batched(
                || {
                    counter += 1;
                    process_instance(&format!("pi{}", counter), n)
                },
                |entities| {
                    let mut session = session(&store, &registry);
                    for entity in &entities {
                        session.insert(black_box(entity)).unwrap();
                    }
                    session.commit().unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// ============================================================================
// Composite Load Benchmarks
// ============================================================================

fn bench_composite_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_composite_by_id");
    let (store, registry) = setup();

    let mut writer = session(&store, &registry);
    for entity in process_instance("pi", 50) {
        writer.insert(&entity).unwrap();
    }
    writer.commit().unwrap();

    group.bench_function("cold", |b| {
        b.iter(|| {
            let mut reader = session(&store, &registry);
            black_box(reader.select_composite_by_id("processInstance", "pi").unwrap())
        })
    });

    group.bench_function("cached", |b| {
        let mut reader = session(&store, &registry);
        reader.select_composite_by_id("processInstance", "pi").unwrap();
        b.iter(|| black_box(reader.select_composite_by_id("processInstance", "pi").unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_commit, bench_composite_load);
criterion_main!(benches);
