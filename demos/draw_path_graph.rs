use asrel_valley::{RelType, RelationshipIndex, Topology};
use petgraph::dot::Dot;

fn main() {
    let index = RelationshipIndex::from_edges(vec![
        (1, 2, RelType::ProviderToCustomer),
        (1, 3, RelType::ProviderToCustomer),
        (2, 4, RelType::ProviderToCustomer),
        (2, 5, RelType::ProviderToCustomer),
        (2, 3, RelType::PeerToPeer),
        (3, 5, RelType::ProviderToCustomer),
        (3, 6, RelType::ProviderToCustomer),
    ]);

    println!("Basic topology");
    println!("{:?}", Dot::new(&Topology::from_index(&index).graph));

    let topo_path = index.valley_free_of(4);
    println!("Path topology");
    println!("{:?}", Dot::new(&topo_path.graph));

    // You can visualize the graphs online at https://dreampuf.github.io/GraphvizOnline/
}
