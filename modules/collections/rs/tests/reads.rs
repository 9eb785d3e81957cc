use eyre::Result;
use probekit_collections_rs::collapsed::{merge, CollapsedReads};
use probekit_collections_rs::contacts::InterChromosomeHitStore;
use probekit_core_rs::loc::{PackedInterval, Strand};

fn read(start: i64, strand: Strand) -> PackedInterval {
    PackedInterval::pack(start, start + 35, strand).unwrap()
}

#[test]
fn collapse_replicates_and_merge() -> Result<()> {
    let replicates = [
        vec![
            read(300, Strand::Forward),
            read(100, Strand::Reverse),
            read(100, Strand::Forward),
            read(300, Strand::Forward),
        ],
        vec![read(100, Strand::Forward), read(50, Strand::Unknown)],
        vec![],
    ];

    let collapsed: Vec<_> = replicates
        .iter()
        .map(|x| CollapsedReads::from_unsorted(x.clone()))
        .collect::<Result<_>>()?;
    assert_eq!(collapsed[0].len(), 3);
    assert!(collapsed[2].is_empty());

    let merged = merge(&collapsed)?;
    let runs: Vec<_> = merged
        .runs()
        .map(|(read, count)| (read.start(), read.strand(), *count))
        .collect();
    assert_eq!(
        runs,
        [
            (50, Strand::Unknown, 1),
            (100, Strand::Forward, 2),
            (100, Strand::Reverse, 1),
            (300, Strand::Forward, 2),
        ]
    );
    assert_eq!(merged.total_count(), 6);

    // Expanding the merged set gives back every read in sorted order
    let mut everything: Vec<_> = replicates.into_iter().flatten().collect();
    probekit_core_rs::loc::sort(&mut everything);
    assert_eq!(merged.expand(), everything);
    Ok(())
}

#[test]
fn contacts_from_paired_reads() {
    let pairs = [
        ("chr2", 900, 10),
        ("chr3", 100, 5000),
        ("chr2", 100, 70),
        ("chr2", 100, 20),
        ("chr2", 100, 20),
    ];

    let mut store = InterChromosomeHitStore::new("chr1");
    for (partner, source, hit) in pairs {
        store.add_hit(partner, read(source, Strand::Forward), read(hit, Strand::Reverse));
    }
    store.sort_collection();
    store.trim();

    assert_eq!(store.chromosome_names_with_hits(), ["chr2", "chr3"]);
    let chr2: Vec<_> = store
        .hits_for("chr2")
        .map(|(source, partner)| (source.start(), partner.start()))
        .collect();
    assert_eq!(chr2, [(100, 20), (100, 20), (100, 70), (900, 10)]);
    assert_eq!(store.hit_count(), 5);

    let starts: Vec<_> = store.all_source_positions().iter().map(|x| x.start()).collect();
    assert_eq!(starts, [100, 100, 100, 100, 900]);
}
