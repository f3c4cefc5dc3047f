use std::fs::File;

use asrel_valley::{is_valley_free, RelationshipIndex};

fn main() {
    let file = File::open("20250801.as-rel2.txt").unwrap();
    let (index, _) = RelationshipIndex::from_caida(file).unwrap();

    let university_of_twente_asn = 1133;
    let universidade_de_sao_paulo_asn = 28571;
    let ut_path = index.valley_free_of(university_of_twente_asn);

    println!("Paths from UT to USP:");
    for path in ut_path.paths_to(university_of_twente_asn, universidade_de_sao_paulo_asn) {
        assert!(is_valley_free(&index, &path).valid);
        println!("  {:?}", path);
    }
}
