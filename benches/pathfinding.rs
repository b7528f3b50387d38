use criterion::{Criterion, black_box, criterion_group, criterion_main};
use railslot::model::{EdgeLocation, Graph};
use railslot::pathfinding::PathfinderBuilder;
use railslot::Distance;

/// Chain of `n` edges of equal length: edge `i` goes from node `i` to node
/// `i + 1`.
struct LineGraph {
    n: usize,
    length: Distance,
}

impl Graph for LineGraph {
    type Node = usize;
    type Edge = usize;

    fn edge_end(&self, edge: &usize) -> usize {
        edge + 1
    }

    fn adjacent_edges(&self, node: &usize) -> Vec<usize> {
        if *node < self.n {
            vec![*node]
        } else {
            vec![]
        }
    }
}

/// Square grid of nodes `(x, y)`, edges going right and up. Many equal-cost
/// paths, which stresses the queue and the seen-set.
struct GridGraph {
    side: usize,
    length: Distance,
}

impl Graph for GridGraph {
    type Node = (usize, usize);
    type Edge = ((usize, usize), (usize, usize));

    fn edge_end(&self, edge: &Self::Edge) -> Self::Node {
        edge.1
    }

    fn adjacent_edges(&self, node: &Self::Node) -> Vec<Self::Edge> {
        let (x, y) = *node;
        let mut res = Vec::new();
        if x + 1 < self.side {
            res.push(((x, y), (x + 1, y)));
        }
        if y + 1 < self.side {
            res.push(((x, y), (x, y + 1)));
        }
        res
    }
}

fn bench_line(c: &mut Criterion) {
    let graph = LineGraph {
        n: 1000,
        length: 100,
    };
    c.bench_function("line_1000_edges", |b| {
        b.iter(|| {
            let pathfinder = PathfinderBuilder::new(&graph)
                .edge_to_length(|_| graph.length)
                .build()
                .unwrap();
            let path = pathfinder
                .run_to_locations(vec![
                    vec![EdgeLocation::new(0, 0)],
                    vec![EdgeLocation::new(999, 50)],
                ])
                .unwrap()
                .unwrap();
            black_box(path)
        })
    });
}

fn bench_grid(c: &mut Criterion) {
    let graph = GridGraph {
        side: 30,
        length: 100,
    };
    c.bench_function("grid_30x30", |b| {
        b.iter(|| {
            let pathfinder = PathfinderBuilder::new(&graph)
                .edge_to_length(|_| graph.length)
                .build()
                .unwrap();
            let path = pathfinder
                .run_to_locations(vec![
                    vec![EdgeLocation::new(((0, 0), (1, 0)), 0)],
                    vec![EdgeLocation::new(((28, 29), (29, 29)), 100)],
                ])
                .unwrap()
                .unwrap();
            black_box(path)
        })
    });
}

criterion_group!(benches, bench_line, bench_grid);
criterion_main!(benches);
