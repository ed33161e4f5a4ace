fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Auth service: register, login, verify
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/auth.proto"], &["proto/"])?;

    // User service: identity store, served by parcel-service
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/user.proto"], &["proto/"])?;

    // Parcel service: lifecycle and tracking
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/parcel.proto"], &["proto/"])?;

    Ok(())
}
