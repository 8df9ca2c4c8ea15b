use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::Path;
use structura::core::{AnalyzerConfig, FolderAnalyzer, StructureGraph};

fn write_sample_project(root: &Path, copies: usize) {
    for i in 0..copies {
        let python = format!(
            r#"
class TestClass{i}:
    def __init__(self):
        self.value = {i}

    def process(self):
        return self.calculate() * 2

    def calculate(self):
        return self.value + 10

def main():
    instance = TestClass{i}()
    return instance.process()
"#
        );
        std::fs::write(root.join(format!("test_{i}.py")), python).unwrap();

        let java = format!(
            r#"package bench;

public class Service{i} extends Base {{
    private int value;

    public Service{i}(int value) {{
        this.value = value;
    }}

    public int process() {{
        return calculate() * 2;
    }}

    private int calculate() {{
        return value + 10;
    }}
}}
"#
        );
        std::fs::write(root.join(format!("Service{i}.java")), java).unwrap();

        let go = format!(
            r#"package bench

type Worker{i} struct {{
	ID int
}}

func (w *Worker{i}) Run(n int) int {{
	return helper(w.ID, n)
}}
"#
        );
        std::fs::write(root.join(format!("worker_{i}.go")), go).unwrap();

        let cpp = format!(
            r#"#include "shape.hpp"

namespace geo {{
class Shape{i} {{
public:
    double area() const {{ return compute({i}); }}
}};
}}
"#
        );
        std::fs::write(root.join(format!("shape_{i}.cpp")), cpp).unwrap();
    }
}

fn benchmark_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("folder_analysis");

    let small = tempfile::TempDir::new().unwrap();
    write_sample_project(small.path(), 10);
    let medium = tempfile::TempDir::new().unwrap();
    write_sample_project(medium.path(), 100);

    let config = AnalyzerConfig::default();

    group.bench_function("small_codebase", |b| {
        b.iter(|| {
            let report = FolderAnalyzer::new(&config).analyze(black_box(small.path()));
            black_box(report)
        });
    });

    group.bench_function("medium_codebase", |b| {
        b.iter(|| {
            let report = FolderAnalyzer::new(&config).analyze(black_box(medium.path()));
            black_box(report)
        });
    });

    let single_threaded = AnalyzerConfig::default().with_concurrency(1);
    group.bench_function("medium_codebase_single_thread", |b| {
        b.iter(|| {
            let report = FolderAnalyzer::new(&single_threaded).analyze(black_box(medium.path()));
            black_box(report)
        });
    });

    group.finish();
}

fn benchmark_graph(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    write_sample_project(dir.path(), 100);
    let config = AnalyzerConfig::default();
    let report = FolderAnalyzer::new(&config).analyze(dir.path()).unwrap();

    c.bench_function("structure_graph", |b| {
        b.iter(|| black_box(StructureGraph::from_report(black_box(&report))));
    });
}

criterion_group!(benches, benchmark_analysis, benchmark_graph);
criterion_main!(benches);
