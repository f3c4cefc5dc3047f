use std::fs::File;

use asrel_valley::RelationshipIndex;

fn main() {
    let file = File::open("20250801.as-rel2.txt").unwrap();
    let (index, _) = RelationshipIndex::from_caida(file).unwrap();

    let university_of_twente_asn = 1133;
    let universidade_de_sao_paulo_asn = 28571;
    let ut_path = index.valley_free_of(university_of_twente_asn);

    // Use A* to find the shortest path between two nodes
    let path = ut_path
        .shortest_path_to(university_of_twente_asn, universidade_de_sao_paulo_asn)
        .unwrap();

    println!("Path from UT to USP: {:?}", path);
}
