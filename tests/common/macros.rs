/// Asserts that the live population matches the expected value.
#[macro_export]
macro_rules! assert_population {
    ($world:expr, $count:expr) => {
        assert_eq!($world.population(), $count, "Population count mismatch");
    };
}

/// Asserts that a creature with the given id is no longer in the world.
#[macro_export]
macro_rules! assert_creature_dead {
    ($world:expr, $id:expr) => {
        assert!(
            $world.find_creature($id).is_none(),
            "Creature {} should be dead but was found alive",
            $id
        );
    };
}

/// Asserts that a creature with the given id is still in the world.
#[macro_export]
macro_rules! assert_creature_alive {
    ($world:expr, $id:expr) => {
        assert!(
            $world.find_creature($id).is_some(),
            "Creature {} should be alive",
            $id
        );
    };
}
