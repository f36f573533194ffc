use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lispy::{Environment, evaluate, parse_program, tokenize};

const BENCH_INPUT: &str = r#"
(define (fib n)
  (if (< n 2)
      n
      (+ (fib (- n 1))
         (fib (- n 2)))))

(define (factorial n)
  (if (= n 0)
      1
      (* n (factorial (- n 1)))))

(define (count-down n acc)
  (if (> n 0) (count-down (- n 1) (cons n acc)) acc))

(fib 15)
(factorial 20)
(length (count-down 200 (quote ())))
(quote (nested (lists (of (symbols 1 2.5 -10)))))
"#;

fn bench_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reader");

    group.bench_with_input(
        BenchmarkId::new("tokenize", "program"),
        &BENCH_INPUT,
        |b, input| b.iter(|| tokenize(black_box(input))),
    );
    group.bench_with_input(
        BenchmarkId::new("parse_program", "program"),
        &BENCH_INPUT,
        |b, input| b.iter(|| parse_program(black_box(input))),
    );

    group.finish();
}

fn bench_evaluator(c: &mut Criterion) {
    let mut group = c.benchmark_group("Evaluator");
    let program = match parse_program(BENCH_INPUT) {
        Ok(program) => program,
        Err(e) => panic!("benchmark input does not parse: {}", e),
    };

    group.bench_function("evaluate_program", |b| {
        b.iter(|| evaluate(black_box(&program), Environment::new_global_populated()))
    });

    group.finish();
}

criterion_group!(benches, bench_reader, bench_evaluator);
criterion_main!(benches);
