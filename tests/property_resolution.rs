// Property-based tests for bean resolution
//
// Scope semantics must hold for any set of bean names and any request order.

use ferrous_ioc::{BeanDefinition, BeanFactory, FactoryOptions, InMemoryRegistry, IocError, Resolver, ResolverCore, SupplierStrategy};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Bean {
    name: String,
}

fn names() -> impl Strategy<Value = HashSet<String>> {
    prop::collection::hash_set("[a-z][a-zA-Z0-9]{0,12}", 1..12)
}

fn build(singletons: &[String], prototypes: &[String], shards: usize) -> (BeanFactory, Arc<AtomicUsize>) {
    let registry = InMemoryRegistry::new();
    for name in singletons {
        registry.register_definition(BeanDefinition::singleton(name.as_str())).unwrap();
    }
    for name in prototypes {
        registry.register_definition(BeanDefinition::prototype(name.as_str())).unwrap();
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let factory = BeanFactory::builder()
        .registry(Arc::new(registry))
        .strategy_fn(move |_, name, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Bean { name: name.to_string() }) as ferrous_ioc::AnyArc)
        })
        .options(FactoryOptions::default().singleton_shards(shards))
        .build()
        .unwrap();
    (factory, calls)
}

proptest! {
    #[test]
    fn singletons_are_stable_for_any_request_order(
        names in names(),
        order in prop::collection::vec(any::<prop::sample::Index>(), 1..64),
        shard_bits in 0u32..7,
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let (factory, calls) = build(&names, &[], 1 << shard_bits);

        let mut first_seen: HashMap<String, Arc<Bean>> = HashMap::new();
        for index in order {
            let name = index.get(&names);
            let bean = factory.get_typed::<Bean>(name).unwrap();
            prop_assert_eq!(&bean.name, name);
            if let Some(previous) = first_seen.get(name) {
                prop_assert!(Arc::ptr_eq(previous, &bean));
            } else {
                first_seen.insert(name.clone(), bean);
            }
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), first_seen.len());
        prop_assert_eq!(factory.singleton_count(), first_seen.len());
    }
}

proptest! {
    #[test]
    fn prototypes_are_built_per_request(names in names(), repeats in 1usize..6) {
        let names: Vec<String> = names.into_iter().collect();
        let (factory, calls) = build(&[], &names, 64);

        for name in &names {
            let built: Vec<Arc<Bean>> = (0..repeats)
                .map(|_| factory.get_typed::<Bean>(name).unwrap())
                .collect();
            for pair in built.windows(2) {
                prop_assert!(!Arc::ptr_eq(&pair[0], &pair[1]));
            }
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), names.len() * repeats);
        prop_assert_eq!(factory.singleton_count(), 0);
        prop_assert!(factory.prototypes_in_creation().is_empty());
    }
}

proptest! {
    #[test]
    fn unknown_names_never_resolve(known in names(), unknown in "[A-Z][a-z]{0,8}") {
        let known: Vec<String> = known.into_iter().collect();
        let (factory, calls) = build(&known, &[], 64);

        // Known names start lowercase, unknown ones uppercase
        let result = factory.get_bean(&unknown);
        prop_assert!(matches!(result, Err(IocError::NoSuchDefinition(ref name)) if *name == unknown));
        prop_assert!(!factory.contains_bean(&unknown));
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
