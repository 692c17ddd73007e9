use costar::config::AntecedentCheck;
use costar::error::CostarError;
use costar::synthesis::{render, CandidateSpec, RelationNames, Synthesizer};

fn spec(level: usize, antecedents: AntecedentCheck) -> CandidateSpec {
    Synthesizer::new(antecedents).synthesize(level).expect("valid level")
}

#[test]
fn level_zero_is_rejected() {
    let err = Synthesizer::new(AntecedentCheck::PrefixSuffix)
        .synthesize(0)
        .unwrap_err();
    assert!(matches!(err, CostarError::Synthesis(_)));
}

#[test]
fn shape_for_levels_one_to_five() {
    for k in 1..=5 {
        let spec = spec(k, AntecedentCheck::PrefixSuffix);
        assert_eq!(spec.level(), k);
        assert_eq!(spec.roles().len(), k);
        assert_eq!(spec.group_by(), (1..=k).collect::<Vec<_>>().as_slice());

        let chain: Vec<(usize, usize)> = spec.co_occurrences().collect();
        let expected_chain: Vec<(usize, usize)> = (1..k).map(|i| (i, i + 1)).collect();
        assert_eq!(chain, expected_chain, "level {k} co-occurrence chain");
        assert!(spec.shares_one_movie());

        // every pair, not only neighbours
        let orderings: Vec<(usize, usize)> = spec.orderings().collect();
        assert_eq!(orderings.len(), k * (k - 1) / 2, "level {k} orderings");
        for i in 1..=k {
            for j in (i + 1)..=k {
                assert!(orderings.contains(&(i, j)), "level {k} misses r{i} < r{j}");
            }
        }
        assert!(orderings.iter().all(|(i, j)| i < j));

        if k == 1 {
            assert!(spec.antecedents().is_empty());
            assert_eq!(spec.memberships().count(), 0);
            assert_eq!(spec.prefix_antecedent(), None);
        } else {
            let projections: Vec<Vec<usize>> = spec
                .antecedents()
                .iter()
                .map(|a| a.projection().to_vec())
                .collect();
            assert_eq!(
                projections,
                vec![(1..k).collect::<Vec<_>>(), (2..=k).collect::<Vec<_>>()]
            );
            assert!(spec.antecedents().iter().all(|a| a.level() == k - 1));
            assert_eq!(spec.memberships().count(), 2 * (k - 1));
            assert_eq!(spec.prefix_antecedent(), Some(0));
        }
    }
}

#[test]
fn all_subsets_checks_every_projection() {
    for k in 2..=5 {
        let spec = spec(k, AntecedentCheck::AllSubsets);
        assert_eq!(spec.antecedents().len(), k);
        let mut omitted: Vec<usize> = spec
            .antecedents()
            .iter()
            .map(|a| {
                assert_eq!(a.projection().len(), k - 1);
                (1..=k).find(|p| !a.projection().contains(p)).unwrap()
            })
            .collect();
        omitted.sort_unstable();
        assert_eq!(omitted, (1..=k).collect::<Vec<_>>());
        assert_eq!(spec.memberships().count(), k * (k - 1));
        assert_eq!(spec.prefix_antecedent(), Some(0));
    }
}

#[test]
fn membership_slots_line_up_with_projections() {
    let spec = spec(4, AntecedentCheck::AllSubsets);
    for (antecedent, slot, role) in spec.memberships() {
        assert_eq!(spec.antecedents()[antecedent].projection()[slot - 1], role);
    }
}

#[test]
fn level_one_renders_a_plain_count() {
    let sql = render(
        &spec(1, AntecedentCheck::PrefixSuffix),
        &RelationNames::default(),
        None,
    );
    assert_eq!(
        sql,
        "select r1.actor as actor1, count(distinct r1.movie) as support\n\
         from qualifying_appearance r1\n\
         group by r1.actor\n\
         order by actor1"
    );
}

#[test]
fn level_two_renders_pairs_over_frequent_singles() {
    let sql = render(
        &spec(2, AntecedentCheck::PrefixSuffix),
        &RelationNames::default(),
        Some(5),
    );
    assert_eq!(
        sql,
        "select r1.actor as actor1, r2.actor as actor2, count(distinct r1.movie) as support\n\
         from qualifying_appearance r1, qualifying_appearance r2, lattice_level_1 a1, lattice_level_1 a2\n\
         where r1.movie = r2.movie and r1.actor < r2.actor and a1.actor1 = r1.actor and a2.actor1 = r2.actor\n\
         group by r1.actor, r2.actor\n\
         having count(distinct r1.movie) >= 5\n\
         order by actor1, actor2"
    );
}

#[test]
fn level_three_joins_prefix_and_suffix() {
    let sql = render(
        &spec(3, AntecedentCheck::PrefixSuffix),
        &RelationNames::default(),
        None,
    );
    for fragment in [
        "lattice_level_2 a1, lattice_level_2 a2",
        "r1.movie = r2.movie and r2.movie = r3.movie",
        "r1.actor < r2.actor and r1.actor < r3.actor and r2.actor < r3.actor",
        "a1.actor1 = r1.actor and a1.actor2 = r2.actor",
        "a2.actor1 = r2.actor and a2.actor2 = r3.actor",
        "group by r1.actor, r2.actor, r3.actor",
    ] {
        assert!(sql.contains(fragment), "missing `{fragment}` in\n{sql}");
    }
    assert!(!sql.contains("having"));
    assert!(!sql.contains("a3."));
}

#[test]
fn relation_names_are_honoured() {
    let names = RelationNames {
        base: "pma".into(),
        level_prefix: "l".into(),
    };
    let sql = render(&spec(3, AntecedentCheck::AllSubsets), &names, None);
    assert!(sql.contains("from pma r1, pma r2, pma r3, l2 a1, l2 a2, l2 a3"));
    assert_eq!(names.level(7), "l7");
}

#[test]
fn synthesis_is_idempotent() {
    let synthesizer = Synthesizer::new(AntecedentCheck::PrefixSuffix);
    for k in 1..=5 {
        let first = synthesizer.synthesize(k).unwrap();
        let second = synthesizer.synthesize(k).unwrap();
        assert_eq!(first, second);
        let names = RelationNames::default();
        assert_eq!(render(&first, &names, Some(3)), render(&second, &names, Some(3)));
    }
}

#[test]
fn summary_counts_constraints() {
    let spec = spec(4, AntecedentCheck::PrefixSuffix);
    assert_eq!(
        spec.to_string(),
        "level 4: 4 roles, 3 co-occurrence, 6 ordering, 2 antecedent lookups"
    );
}
