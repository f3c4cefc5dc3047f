use std::fs::File;

use asrel_valley::RelationshipIndex;

fn main() {
    let file = File::open("20250801.as-rel2.txt").unwrap();
    let (index, report) = RelationshipIndex::from_caida(file).unwrap();

    println!("Number of ases: {}", index.asn_count());
    println!("Skipped lines: {}", report.skipped);
    for ambiguity in report.ambiguities {
        println!("Ambiguous: {:?}", ambiguity);
    }
}
