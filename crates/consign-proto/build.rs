fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_file = "../../proto/consign/v1/order_management.proto";

    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&[proto_file], &["../../proto"])?;

    println!("cargo:rerun-if-changed={proto_file}");
    println!("cargo:rerun-if-changed=../../proto/consign/v1");

    Ok(())
}
