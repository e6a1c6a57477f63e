fn main() -> anyhow::Result<()> {
    bakery_storefront_lib::run()
}
