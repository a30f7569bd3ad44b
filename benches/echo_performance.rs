use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tempfile::tempdir;
use tokio::runtime::Runtime;
use udsecho::common::{spawn_connection_server, spawn_datagram_server};
use udsecho::{
    ClientConfig, ConnectionConfig, DatagramConfig, DatagramEchoClient, EchoClient,
    SeqpacketEchoClient, SeqpacketListener, StreamEchoClient, StreamListener,
};

const SIZES: [usize; 4] = [64, 256, 1024, 4096];

fn bench_echo_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp_dir = tempdir().unwrap();

    let mut group = c.benchmark_group("echo_round_trip");

    for size in SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        let data = vec![b'x'; size];

        group.bench_with_input(BenchmarkId::new("stream", size), &data, |b, data| {
            let path = temp_dir.path().join(format!("stream-{size}.sock"));
            let server = rt
                .block_on(spawn_connection_server::<StreamListener>(ConnectionConfig::new(&path)))
                .unwrap();
            let mut client = rt.block_on(StreamEchoClient::connect(&path)).unwrap();

            b.iter(|| {
                let response = rt.block_on(client.echo(black_box(data))).unwrap();
                assert_eq!(response.len(), data.len());
            });

            drop(client);
            rt.block_on(server.stop()).unwrap();
        });

        group.bench_with_input(BenchmarkId::new("seqpacket", size), &data, |b, data| {
            let path = temp_dir.path().join(format!("seqpacket-{size}.sock"));
            let server = rt
                .block_on(spawn_connection_server::<SeqpacketListener>(ConnectionConfig::new(&path)))
                .unwrap();
            let mut client = rt.block_on(SeqpacketEchoClient::connect(&path)).unwrap();

            b.iter(|| {
                let response = rt.block_on(client.echo(black_box(data))).unwrap();
                assert_eq!(response.len(), data.len());
            });

            drop(client);
            rt.block_on(server.stop()).unwrap();
        });

        group.bench_with_input(BenchmarkId::new("datagram", size), &data, |b, data| {
            let path = temp_dir.path().join(format!("dgram-{size}.sock"));
            let server = rt
                .block_on(spawn_datagram_server(DatagramConfig::new(&path)))
                .unwrap();
            let config = ClientConfig::default()
                .with_local_path(temp_dir.path().join(format!("dgram-client-{size}.sock")));
            let mut client = rt
                .block_on(DatagramEchoClient::connect_with_config(&path, config))
                .unwrap();

            b.iter(|| {
                let response = rt.block_on(client.echo(black_box(data))).unwrap();
                assert_eq!(response.len(), data.len());
            });

            drop(client);
            rt.block_on(server.stop()).unwrap();
        });
    }

    group.finish();
}

fn bench_connection_setup(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("setup.sock");
    let config = ConnectionConfig::new(&path).with_max_connections(100_000);
    let server = rt
        .block_on(spawn_connection_server::<SeqpacketListener>(config))
        .unwrap();

    c.bench_function("seqpacket_connect_and_ping", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut client = SeqpacketEchoClient::connect(&path).await.unwrap();
                client.echo(black_box(b"ping")).await.unwrap()
            })
        });
    });

    rt.block_on(server.stop()).unwrap();
}

criterion_group!(benches, bench_echo_round_trip, bench_connection_setup);
criterion_main!(benches);
