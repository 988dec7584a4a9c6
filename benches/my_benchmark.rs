use criterion::{criterion_group, criterion_main, Criterion};
use tlox::Lox;

fn fibonacci() {
    let src = r#"
        fun fib(num n) -> num {
            if (n < 2) return n;
            return fib(n - 2) + fib(n - 1);
        }

        fib(20);
    "#;

    let mut lox = Lox::new();
    lox.run(src).unwrap();
}

fn zoo() {
    let src = r#"
        class Zoo {
            var aardvark = 1;
            var baboon   = 1;
            var cat      = 1;
            var donkey   = 1;
            var elephant = 1;
            var fox      = 1;

            method ant()    { return this.aardvark; }
            method banana() { return this.baboon; }
            method tuna()   { return this.cat; }
            method hay()    { return this.donkey; }
            method grass()  { return this.elephant; }
            method mouse()  { return this.fox; }
        }

        var zoo = Zoo();
        var sum = 0;
        while (sum < 10000) {
            sum += zoo.ant()
                + zoo.banana()
                + zoo.tuna()
                + zoo.hay()
                + zoo.grass()
                + zoo.mouse();
        }
    "#;

    let mut lox = Lox::new();
    lox.run(src).unwrap();
}

fn operators() {
    let src = r#"
        class Vec {
            var x = 0;
            method constructor(x) { this.x = x; }
            operator method add(a, b) { return Vec(a.x + b.x); }
        }

        var acc = Vec(0);
        var one = Vec(1);
        for (var i = 0; i < 2000; i++) {
            acc = acc + one;
        }
    "#;

    let mut lox = Lox::new();
    lox.run(src).unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("my-benchmark");
    group.sample_size(20);
    group.bench_function("fib 20", |b| b.iter(fibonacci));
    group.bench_function("zoo", |b| b.iter(zoo));
    group.bench_function("operator overloads", |b| b.iter(operators));
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
