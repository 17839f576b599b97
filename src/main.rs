fn main() -> anyhow::Result<()> {
    lifecache_lib::run()
}
