use ecomap::{BoundingBox, ClusterIndex, ClusterOptions, EcomapError, PointFeature, QueryEntry};
use std::collections::BTreeSet;

/// Deterministic scatter of points around a few city centres.
fn scatter(count: usize, seed: u64) -> Vec<PointFeature> {
    scatter_around(
        &[(-8.61, 41.15), (-9.14, 38.72), (2.35, 48.86), (13.40, 52.52)],
        1.0,
        count,
        seed,
    )
}

/// Points within `spread` degrees of the given `(lng, lat)` centres.
fn scatter_around(
    centres: &[(f64, f64)],
    spread: f64,
    count: usize,
    seed: u64,
) -> Vec<PointFeature> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };

    (0..count)
        .map(|i| {
            let (lng, lat) = centres[i % centres.len()];
            PointFeature::new(
                (i as i64).into(),
                lng + (next() - 0.5) * 2.0 * spread,
                lat + (next() - 0.5) * 2.0 * spread,
            )
        })
        .collect()
}

fn options() -> ClusterOptions {
    ClusterOptions::default().with_zoom_range(0, 16)
}

fn total(entries: &[QueryEntry]) -> usize {
    entries.iter().map(QueryEntry::point_count).sum()
}

fn summary(entries: &[QueryEntry]) -> Vec<(bool, usize, [u64; 2])> {
    entries
        .iter()
        .map(|e| {
            let [lng, lat] = e.coordinates();
            (e.is_cluster(), e.point_count(), [lng.to_bits(), lat.to_bits()])
        })
        .collect()
}

#[test]
fn test_build_is_deterministic() {
    let a = ClusterIndex::load(scatter(500, 7), &options()).unwrap();
    let b = ClusterIndex::load(scatter(500, 7), &options()).unwrap();

    for zoom in 0..=17 {
        let world = BoundingBox::world();
        assert_eq!(
            summary(&a.query(&world, f64::from(zoom))),
            summary(&b.query(&world, f64::from(zoom)))
        );
    }
}

#[test]
fn test_every_zoom_conserves_point_count() {
    let index = ClusterIndex::load(scatter(800, 3), &options()).unwrap();
    for zoom in 0..=17 {
        assert_eq!(total(&index.query(&BoundingBox::world(), f64::from(zoom))), 800);
    }
}

#[test]
fn test_entry_count_grows_with_zoom_and_clusters_have_two_points() {
    let index = ClusterIndex::load(scatter(600, 11), &options()).unwrap();
    let mut previous = 0;
    for zoom in 0..=17 {
        let entries = index.query(&BoundingBox::world(), f64::from(zoom));
        assert!(entries.len() >= previous, "fewer entries at zoom {}", zoom);
        assert!(
            entries
                .iter()
                .filter(|e| e.is_cluster())
                .all(|e| e.point_count() >= 2)
        );
        previous = entries.len();
    }
    let finest = index.query(&BoundingBox::world(), 17.0);
    assert_eq!(finest.len(), 600);
    assert!(finest.iter().all(|e| !e.is_cluster()));
}

#[test]
fn test_expansion_zoom_splits_cluster() {
    let index = ClusterIndex::load(scatter(400, 5), &options()).unwrap();
    let clusters: Vec<_> = index
        .query(&BoundingBox::world(), 4.0)
        .into_iter()
        .filter_map(|e| match e {
            QueryEntry::Cluster(cluster) => Some(cluster),
            QueryEntry::Feature(_) => None,
        })
        .collect();
    assert!(!clusters.is_empty());

    for cluster in clusters {
        let expansion = index.expansion_zoom(cluster.id).unwrap();
        assert!(expansion > 4);

        let members: BTreeSet<_> = index
            .leaves(cluster.id, None, 0)
            .unwrap()
            .iter()
            .map(|f| f.id.clone())
            .collect();
        assert_eq!(members.len(), cluster.point_count);

        // At the expansion zoom the members are spread over several entries.
        let entries: Vec<_> = index
            .query(&BoundingBox::world(), f64::from(expansion))
            .into_iter()
            .filter(|entry| match entry {
                QueryEntry::Feature(f) => members.contains(&f.id),
                QueryEntry::Cluster(c) => index
                    .leaves(c.id, Some(1), 0)
                    .unwrap()
                    .first()
                    .is_some_and(|f| members.contains(&f.id)),
            })
            .collect();
        assert!(entries.len() > 1, "cluster {} did not split", cluster.id);
        assert_eq!(total(&entries), cluster.point_count);
    }
}

#[test]
fn test_leaves_paging_covers_all_members() {
    let index = ClusterIndex::load(scatter(300, 9), &options()).unwrap();
    let cluster = index
        .query(&BoundingBox::world(), 0.0)
        .into_iter()
        .filter_map(|e| match e {
            QueryEntry::Cluster(cluster) => Some(cluster),
            QueryEntry::Feature(_) => None,
        })
        .max_by_key(|c| c.point_count)
        .unwrap();

    let all: Vec<_> = index
        .leaves(cluster.id, None, 0)
        .unwrap()
        .iter()
        .map(|f| f.id.clone())
        .collect();

    let mut paged = Vec::new();
    let mut offset = 0;
    loop {
        let page = index.leaves(cluster.id, Some(10), offset).unwrap();
        if page.is_empty() {
            break;
        }
        offset += page.len();
        paged.extend(page.iter().map(|f| f.id.clone()));
    }
    assert_eq!(paged, all);
}

#[test]
fn test_cluster_ids_are_per_build() {
    let first = ClusterIndex::load(scatter(200, 1), &options()).unwrap();
    let cluster_id = first
        .query(&BoundingBox::world(), 2.0)
        .iter()
        .find_map(QueryEntry::cluster_id)
        .unwrap();

    // A rebuild over a smaller set: resolve clusters again through a query.
    let second = ClusterIndex::load(scatter(20, 2), &options()).unwrap();
    let stale = second.expansion_zoom(cluster_id);
    assert!(matches!(stale, Ok(_) | Err(EcomapError::UnknownCluster(_))));

    for entry in second.query(&BoundingBox::world(), 2.0) {
        if let Some(id) = entry.cluster_id() {
            assert!(second.expansion_zoom(id).is_ok());
            assert_eq!(second.leaves(id, None, 0).unwrap().len(), entry.point_count());
        }
    }
}

#[test]
fn test_three_point_scenario_at_world_zoom() {
    let features = vec![
        PointFeature::new(1.into(), 0.0, 0.0),
        PointFeature::new(2.into(), 0.0001, 0.0001),
        PointFeature::new(3.into(), 50.0, 50.0),
    ];
    let index = ClusterIndex::load(
        features,
        &ClusterOptions::default()
            .with_radius(60.0)
            .with_extent(256)
            .with_zoom_range(0, 16),
    )
    .unwrap();

    let coarse = index.query(&BoundingBox::world(), 0.0);
    let mut counts: Vec<_> = coarse.iter().map(QueryEntry::point_count).collect();
    counts.sort();
    assert_eq!(counts, vec![1, 2]);

    let fine = index.query(&BoundingBox::world(), 18.0);
    assert_eq!(fine.len(), 3);
}

#[test]
fn test_empty_index_boundary() {
    let index = ClusterIndex::load(Vec::new(), &options()).unwrap();
    for zoom in [0.0, 7.3, 17.0, 99.0] {
        assert!(index.query(&BoundingBox::world(), zoom).is_empty());
    }
}

#[test]
fn test_query_subset_of_world() {
    let index = ClusterIndex::load(scatter(400, 4), &options()).unwrap();
    let iberia = BoundingBox::new(-10.0, 36.0, -6.0, 43.0);
    let entries = index.query(&iberia, 17.0);
    assert!(!entries.is_empty());
    assert!(
        entries
            .iter()
            .all(|e| iberia.contains(e.coordinates()[0], e.coordinates()[1]))
    );
}

/// Checks that the entries for `bbox` account for every point exactly once:
/// the member sets of the returned clusters are disjoint and their sizes add
/// up to the reported counts, and at the leaf zoom the entries are exactly
/// the features inside the box.
fn assert_conserved_in(index: &ClusterIndex, features: &[PointFeature], bbox: &BoundingBox) {
    for zoom in 0..=17 {
        let entries = index.query(bbox, f64::from(zoom));
        let mut members = BTreeSet::new();
        for entry in &entries {
            match entry {
                QueryEntry::Feature(f) => assert!(members.insert(f.id.clone())),
                QueryEntry::Cluster(c) => {
                    let leaves = index.leaves(c.id, None, 0).unwrap();
                    assert_eq!(leaves.len(), c.point_count);
                    for leaf in leaves {
                        assert!(members.insert(leaf.id.clone()), "{} counted twice", leaf.id);
                    }
                }
            }
        }
        assert_eq!(members.len(), total(&entries), "zoom {}", zoom);
    }

    let inside: BTreeSet<_> = features
        .iter()
        .filter(|f| bbox.contains(f.longitude, f.latitude))
        .map(|f| f.id.clone())
        .collect();
    let leaf_ids: BTreeSet<_> = index
        .query(bbox, 17.0)
        .iter()
        .filter_map(QueryEntry::as_feature)
        .map(|f| f.id.clone())
        .collect();
    assert!(!inside.is_empty());
    assert_eq!(leaf_ids, inside);
}

#[test]
fn test_sub_bbox_conserves_point_count() {
    let features = scatter(800, 3);
    let index = ClusterIndex::load(features.clone(), &options()).unwrap();
    assert_conserved_in(&index, &features, &BoundingBox::new(-10.0, 36.0, -6.0, 43.0));
    assert_conserved_in(&index, &features, &BoundingBox::new(1.5, 48.0, 3.0, 49.5));
}

#[test]
fn test_antimeridian_bbox_conserves_point_count() {
    let features = scatter_around(&[(179.5, -17.0), (-179.5, -16.0), (0.0, 0.0)], 0.4, 600, 21);
    let index = ClusterIndex::load(features.clone(), &options()).unwrap();
    let fiji = BoundingBox::new(179.0, -18.0, -179.0, -15.0);
    assert_conserved_in(&index, &features, &fiji);

    let entries = index.query(&fiji, 17.0);
    assert!(entries.iter().all(|e| e.coordinates()[0].abs() > 178.0));
}
